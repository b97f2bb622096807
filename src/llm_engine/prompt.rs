//! Prompt construction for station announcements

use crate::llm_engine::provider::Message;
use crate::schedule::ScheduleRecord;

pub const SYSTEM_PROMPT: &str = "You are a professional railway station announcer.
Your task is to generate CLEAR, POLITE, and SHORT announcements for passengers in ENGLISH.

Rules:
1. Speak ONLY in ENGLISH.
2. Use a formal, announcer style (\"Attention please\", \"We inform you\").
3. If a train is delayed, always apologize for the inconvenience.
4. Include key info: Train number, Destination, Departure time, Platform.
5. Keep it concise (max 2-3 sentences).
6. NO markdown, emojis, or special characters.

Examples:
- \"Attention please. The Intercity train number 1234 to London will depart from platform 3. It is delayed by approximately 10 minutes. We apologize for the delay.\"
- \"The train to Berlin is now arriving at platform 2. Please stand back from the platform edge.\"
";

/// Record data block for the user turn. Same record, same prompt.
pub fn build_user_prompt(record: &ScheduleRecord) -> String {
    let status = if record.is_delayed() {
        format!("STATUS: DELAYED by {} minutes", record.delay_minutes)
    } else {
        "STATUS: ON TIME".to_string()
    };

    format!(
        "Data:\nTrain Number: {}\nOperator: {}\nDestination: {}\nOrigin: {}\nTime: {}\nPlatform: {}\n{}\n\nGenerate station announcement in English:",
        record.identifier,
        record.operator,
        record.destination,
        record.origin,
        record.scheduled_time,
        record.platform,
        status
    )
}

pub fn build_messages(record: &ScheduleRecord) -> Vec<Message> {
    vec![Message::system(SYSTEM_PROMPT), Message::user(build_user_prompt(record))]
}

/// Sentence spoken when no text could be generated. Always names the train and destination.
pub fn fallback_announcement(record: &ScheduleRecord) -> String {
    if record.is_delayed() {
        format!(
            "Attention. Train {} to {} is delayed.",
            record.identifier, record.destination
        )
    } else {
        format!(
            "Attention. Train {} to {} departs at {} from platform {}.",
            record.identifier, record.destination, record.scheduled_time, record.platform
        )
    }
}
