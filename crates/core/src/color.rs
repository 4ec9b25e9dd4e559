/// Dominant color classification for a single video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorType {
    R,
    G,
    B,
    L,
    N,
}

/// The fixed 64-entry expected-color map used by the temporal hash:
/// indices 0-15 = R, 16-31 = G, 32-47 = B, 48-63 = L.
pub const DOMINANT_COLOR_MAP: [ColorType; 64] = build_map();

const fn build_map() -> [ColorType; 64] {
    let mut map = [ColorType::N; 64];
    let mut i = 0;
    while i < 16 {
        map[i] = ColorType::R;
        i += 1;
    }
    while i < 32 {
        map[i] = ColorType::G;
        i += 1;
    }
    while i < 48 {
        map[i] = ColorType::B;
        i += 1;
    }
    while i < 64 {
        map[i] = ColorType::L;
        i += 1;
    }
    map
}
