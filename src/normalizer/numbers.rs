//! Number to words conversion
//!
//! American English cardinals without "and": 2426 → "two thousand four hundred twenty-six".

const ONES: &[&str] = &[
    "zero",
    "one",
    "two",
    "three",
    "four",
    "five",
    "six",
    "seven",
    "eight",
    "nine",
    "ten",
    "eleven",
    "twelve",
    "thirteen",
    "fourteen",
    "fifteen",
    "sixteen",
    "seventeen",
    "eighteen",
    "nineteen",
];

const TENS: &[&str] = &[
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

/// Scale words for each group of three digits, largest first. u64 tops out in the quintillions.
const SCALES: &[(u64, &str)] = &[
    (1_000_000_000_000_000_000, "quintillion"),
    (1_000_000_000_000_000, "quadrillion"),
    (1_000_000_000_000, "trillion"),
    (1_000_000_000, "billion"),
    (1_000_000, "million"),
    (1_000, "thousand"),
];

/// Spell out an integer
pub fn to_words(n: u64) -> String {
    if n == 0 {
        return ONES[0].to_string();
    }

    let mut parts: Vec<String> = Vec::new();
    let mut remaining = n;

    for &(scale, name) in SCALES {
        if remaining >= scale {
            parts.push(format!("{} {}", below_thousand(remaining / scale), name));
            remaining %= scale;
        }
    }

    if remaining > 0 {
        parts.push(below_thousand(remaining));
    }

    parts.join(" ")
}

/// Read a digit string one digit at a time ("007" → "zero zero seven")
pub fn digits_to_words(digits: &str) -> String {
    digits
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| ONES[d as usize])
        .collect::<Vec<_>>()
        .join(" ")
}

/// 1..=999
fn below_thousand(n: u64) -> String {
    let hundreds = n / 100;
    let rest = n % 100;

    match (hundreds, rest) {
        (0, _) => below_hundred(rest),
        (_, 0) => format!("{} hundred", ONES[hundreds as usize]),
        _ => format!("{} hundred {}", ONES[hundreds as usize], below_hundred(rest)),
    }
}

/// 1..=99
fn below_hundred(n: u64) -> String {
    if n < 20 {
        return ONES[n as usize].to_string();
    }

    let tens = TENS[(n / 10) as usize];
    match n % 10 {
        0 => tens.to_string(),
        ones => format!("{}-{}", tens, ONES[ones as usize]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_numbers() {
        assert_eq!(to_words(0), "zero");
        assert_eq!(to_words(5), "five");
        assert_eq!(to_words(13), "thirteen");
        assert_eq!(to_words(20), "twenty");
        assert_eq!(to_words(21), "twenty-one");
        assert_eq!(to_words(99), "ninety-nine");
    }

    #[test]
    fn test_hundreds_without_and() {
        assert_eq!(to_words(100), "one hundred");
        assert_eq!(to_words(815), "eight hundred fifteen");
        assert_eq!(to_words(2426), "two thousand four hundred twenty-six");
    }

    #[test]
    fn test_large_numbers() {
        assert_eq!(to_words(1_000_000), "one million");
        assert_eq!(to_words(2_000_017), "two million seventeen");
        assert_eq!(
            to_words(u64::MAX),
            "eighteen quintillion four hundred forty-six quadrillion seven hundred forty-four trillion \
             seventy-three billion seven hundred nine million five hundred fifty-one thousand \
             six hundred fifteen"
        );
    }

    #[test]
    fn test_digit_by_digit() {
        assert_eq!(digits_to_words("007"), "zero zero seven");
    }
}
