/// Largest size with the same aspect ratio that fits inside
/// `max_width` x `max_height`. Never upscales, and no side collapses to zero.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }
    let (w, h) = (width as u64, height as u64);
    let (mw, mh) = (max_width as u64, max_height as u64);
    if w * mh >= h * mw {
        (max_width, (h * mw / w).max(1) as u32)
    } else {
        ((w * mh / h).max(1) as u32, max_height)
    }
}

/// [`fit_within`] a square box, bounding the longest edge.
pub fn fit_longest_edge(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    fit_within(width, height, max_edge, max_edge)
}

/// [`fit_within`] bounding only the width.
pub fn fit_width(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    fit_within(width, height, max_width, u32::MAX)
}
