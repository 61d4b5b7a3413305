//! FFmpeg-to-frame conversion helpers.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy the first plane of a packed frame into a buffer of `rows` rows of
/// `row_bytes` bytes each, dropping any row padding FFmpeg added.
pub(crate) fn packed_plane(video_frame: &VideoFrame, row_bytes: usize, rows: usize) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let data = video_frame.data(0);

    if stride == row_bytes {
        return data[..row_bytes * rows].to_vec();
    }

    let mut buffer = Vec::with_capacity(row_bytes * rows);
    for row in data.chunks(stride).take(rows) {
        buffer.extend_from_slice(&row[..row_bytes]);
    }
    buffer
}

/// `numerator / denominator`, or `None` for a zero denominator.
pub(crate) fn rational_to_f64(rational: Rational) -> Option<f64> {
    (rational.denominator() != 0 && rational.numerator() != 0)
        .then(|| rational.numerator() as f64 / rational.denominator() as f64)
}

/// A presentation timestamp in seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}
