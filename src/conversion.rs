//! Internal timestamp helpers.
//!
//! Conversions between stream PTS values, seconds and frame indices that the
//! decoder and detector share.

use ffmpeg_next::Rational;

/// Rescale a PTS value from stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Rescale a PTS value to the index of the frame it belongs to.
///
/// Rounds to the nearest index so that a PTS sitting a hair below an exact
/// frame boundary (common with 1001-based time bases) maps to that frame.
pub(crate) fn pts_to_frame_index(pts: i64, time_base: Rational, frames_per_second: f64) -> u64 {
    let index = (pts_to_seconds(pts, time_base) * frames_per_second).round();
    if index > 0.0 { index as u64 } else { 0 }
}

/// Convert a frame index to a seek timestamp in AV_TIME_BASE (microseconds).
///
/// `Input::seek` goes through `avformat_seek_file` with `stream_index = -1`,
/// which expects microseconds regardless of the stream's own time base.
pub(crate) fn frame_index_to_seek_timestamp(frame_index: u64, frames_per_second: f64) -> i64 {
    let seconds = frame_index as f64 / frames_per_second;
    (seconds * 1_000_000.0) as i64
}

/// Seek timestamp for `frame_index` in a stream that starts at
/// `start_offset` microseconds. Saturates instead of overflowing.
pub(crate) fn container_seek_timestamp(
    frame_index: u64,
    frames_per_second: f64,
    start_offset: i64,
) -> i64 {
    frame_index_to_seek_timestamp(frame_index, frames_per_second).saturating_add(start_offset)
}

/// Largest numerator or denominator MPEG-4 Part 2 accepts in a time base.
const MAX_RATE_TERM: i32 = 65535;

/// Frame rate as a fraction small enough for every supported encoder.
///
/// Container-reported averages such as `1800000/60061` are approximated to
/// the closest fraction with both terms at most 65535.
pub(crate) fn encoder_frame_rate(frames_per_second: f64) -> Rational {
    let rate = unsafe { ffmpeg_sys_next::av_d2q(frames_per_second, MAX_RATE_TERM) };
    Rational::from(rate)
}

/// Frame rate of a stream as a float, or `0.0` if unknown.
pub(crate) fn rational_to_f64(rate: Rational) -> f64 {
    if rate.denominator() == 0 || rate.numerator() <= 0 {
        0.0
    } else {
        rate.numerator() as f64 / rate.denominator() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pts_maps_to_frame_in_ntsc_time_base() {
        // 29.97 fps stored with a 1/30000 time base: frame n has pts n * 1001.
        let time_base = Rational::new(1, 30000);
        let fps = 30000.0 / 1001.0;
        for frame in [0_u64, 1, 7, 299, 1234] {
            let pts = (frame * 1001) as i64;
            assert_eq!(pts_to_frame_index(pts, time_base, fps), frame);
        }
    }

    #[test]
    fn negative_pts_clamps_to_zero() {
        assert_eq!(pts_to_frame_index(-512, Rational::new(1, 12800), 25.0), 0);
    }

    #[test]
    fn seek_timestamp_is_in_microseconds() {
        assert_eq!(frame_index_to_seek_timestamp(90, 30.0), 3_000_000);
        assert_eq!(frame_index_to_seek_timestamp(0, 24.0), 0);
    }

    #[test]
    fn seek_timestamp_saturates_on_huge_targets() {
        assert_eq!(container_seek_timestamp(u64::MAX, 30.0, 1_000), i64::MAX);
        assert_eq!(container_seek_timestamp(90, 30.0, 500), 3_000_500);
    }

    #[test]
    fn encoder_rate_terms_fit_mpeg4_limits() {
        let fps = 1_800_000.0 / 60_061.0;
        let rate = encoder_frame_rate(fps);
        assert!(rate.numerator() > 0 && rate.numerator() <= MAX_RATE_TERM);
        assert!(rate.denominator() > 0 && rate.denominator() <= MAX_RATE_TERM);
        assert!((rational_to_f64(rate) - fps).abs() < 1e-3);
        assert!(rate.invert().denominator() <= MAX_RATE_TERM);
    }

    #[test]
    fn exact_rates_are_kept() {
        assert_eq!(encoder_frame_rate(30.0), Rational::new(30, 1));
        assert_eq!(encoder_frame_rate(30_000.0 / 1001.0), Rational::new(30000, 1001));
        assert_eq!(encoder_frame_rate(25.0), Rational::new(25, 1));
    }

    #[test]
    fn unknown_rate_is_zero() {
        assert_eq!(rational_to_f64(Rational::new(0, 0)), 0.0);
        assert_eq!(rational_to_f64(Rational::new(30, 1)), 30.0);
    }
}
