use gstreamer as gst;

const UNKNOWN: &str = "00:00:00.000";

/// Renders a media time as `HH:mm:ss.mmm`.
///
/// Unknown times (`None`) render as `00:00:00.000`. Hours are not wrapped at
/// 24 and grow past two digits when needed. Sub-millisecond precision is
/// truncated, never rounded up.
pub fn format_time(time: Option<gst::ClockTime>) -> String {
    let Some(time) = time else {
        return String::from(UNKNOWN);
    };

    let millis = time.mseconds();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        millis / 3_600_000,
        millis / 60_000 % 60,
        millis / 1_000 % 60,
        millis % 1_000
    )
}
