// Audio Processing - Resampling
use anyhow::Result;
use log::debug;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Frames fed to the resampler per call
const CHUNK_FRAMES: usize = 4096;

/// Mono sinc resampling. Output length is `input.len() * to / from`, rounded,
/// with the filter delay removed.
pub fn resample(input: &[f32], from_sample_rate: u32, to_sample_rate: u32) -> Result<Vec<f32>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }

    if from_sample_rate == to_sample_rate {
        return Ok(input.to_vec());
    }

    anyhow::ensure!(
        from_sample_rate > 0 && to_sample_rate > 0,
        "invalid sample rates {} -> {}",
        from_sample_rate,
        to_sample_rate
    );

    let ratio = to_sample_rate as f64 / from_sample_rate as f64;

    // Voice output: upsampling from 16/22.05 kHz is the common case
    let (sinc_len, interpolation_type, oversampling) = if ratio >= 2.0 {
        debug!("High-quality upsampling: {}Hz → {}Hz (ratio: {:.2}x)",
               from_sample_rate, to_sample_rate, ratio);
        (256, SincInterpolationType::Cubic, 256)
    } else if ratio > 1.0 {
        debug!("Small upsampling: {}Hz → {}Hz (ratio: {:.2}x)",
               from_sample_rate, to_sample_rate, ratio);
        (256, SincInterpolationType::Linear, 256)
    } else {
        debug!("Anti-aliased downsampling: {}Hz → {}Hz (ratio: {:.2}x)",
               from_sample_rate, to_sample_rate, ratio);
        (256, SincInterpolationType::Cubic, 256)
    };

    let params = SincInterpolationParameters {
        sinc_len,
        f_cutoff: 0.95,
        interpolation: interpolation_type,
        oversampling_factor: oversampling,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        ratio,
        1.0,
        params,
        CHUNK_FRAMES.min(input.len()),
        1,
    )?;

    let delay = resampler.output_delay();
    let expected = (input.len() as f64 * ratio).round() as usize;
    let mut output = Vec::with_capacity(expected + delay);

    let mut pos = 0;
    while input.len() - pos >= resampler.input_frames_next() {
        let next = resampler.input_frames_next();
        let frames = [&input[pos..pos + next]];
        let block = resampler.process(&frames[..], None)?;
        output.extend_from_slice(&block[0]);
        pos += next;
    }

    if pos < input.len() {
        let frames = [&input[pos..]];
        let block = resampler.process_partial(Some(&frames[..]), None)?;
        output.extend_from_slice(&block[0]);
    }

    // Push zeros through until the delayed tail is out
    while output.len() < expected + delay {
        let block = resampler.process_partial::<&[f32]>(None, None)?;
        if block[0].is_empty() {
            break;
        }
        output.extend_from_slice(&block[0]);
    }

    output.drain(..delay.min(output.len()));
    output.truncate(expected);

    debug!("Resampling complete: {} samples → {} samples",
           input.len(), output.len());

    Ok(output)
}

/// Same as [`resample`], but falls back to the original audio on failure
pub fn resample_audio(input: &[f32], from_sample_rate: u32, to_sample_rate: u32) -> Vec<f32> {
    match resample(input, from_sample_rate, to_sample_rate) {
        Ok(result) => result,
        Err(e) => {
            debug!("Resampling failed: {}, returning original audio", e);
            input.to_vec()
        }
    }
}

/// Copy each mono sample into every channel of an interleaved frame
pub fn expand_to_channels(mono: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return mono.to_vec();
    }
    mono.iter()
        .flat_map(|&sample| std::iter::repeat(sample).take(channels))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, rate: u32, secs: f32) -> Vec<f32> {
        let n = (rate as f32 * secs) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_same_rate_is_copy() {
        let input = vec![0.1, -0.2, 0.3];
        assert_eq!(resample(&input, 48_000, 48_000).unwrap(), input);
    }

    #[test]
    fn test_empty_input() {
        assert!(resample(&[], 22_050, 48_000).unwrap().is_empty());
    }

    #[test]
    fn test_upsample_length() {
        let input = sine(440.0, 22_050, 1.0);
        let output = resample(&input, 22_050, 48_000).unwrap();
        assert_eq!(output.len(), 48_000);
        let peak = output.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.3 && peak < 0.7, "peak {}", peak);
    }

    #[test]
    fn test_downsample_length() {
        let input = sine(440.0, 48_000, 0.5);
        let output = resample(&input, 48_000, 16_000).unwrap();
        assert_eq!(output.len(), 8_000);
    }

    #[test]
    fn test_short_input() {
        let input = sine(440.0, 16_000, 0.01);
        let output = resample(&input, 16_000, 48_000).unwrap();
        assert_eq!(output.len(), 480);
    }

    #[test]
    fn test_expand_to_stereo() {
        assert_eq!(expand_to_channels(&[0.1, 0.2], 2), vec![0.1, 0.1, 0.2, 0.2]);
        assert_eq!(expand_to_channels(&[0.1, 0.2], 1), vec![0.1, 0.2]);
    }
}
