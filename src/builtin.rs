//! Built-in chrome icons
//!
//! Supplied as direct definitions so they never touch the library or network.

use crate::icon::{IconDefinition, IconGeometry, PathData};

const SPINNER_PATH: &str = "M288 39.056v16.659c0 10.804 7.281 20.159 17.686 23.066C383.204 100.434 440 171.518 440 256c0 101.689-82.295 184-184 184-101.689 0-184-82.295-184-184 0-84.47 56.786-155.564 134.312-177.219C216.719 75.874 224 66.517 224 55.712V39.064c0-15.709-14.834-27.153-30.046-23.234C86.603 43.482 7.394 141.206 8.003 257.332c.72 137.052 111.477 246.956 248.531 246.667C393.255 503.711 504 392.788 504 256c0-115.633-79.14-212.779-186.211-240.236C302.678 11.889 288 23.456 288 39.056z";

const SAD_TEAR_PATH: &str = "M248 8C111 8 0 119 0 256s111 248 248 248 248-111 248-248S385 8 248 8zm80 168c17.7 0 32 14.3 32 32s-14.3 32-32 32-32-14.3-32-32 14.3-32 32-32zM152 416c-26.5 0-48-21-48-47 0-20 28.5-60.4 41.6-77.8 3.2-4.3 9.6-4.3 12.8 0C171.5 308.6 200 349 200 369c0 26-21.5 47-48 47zm16-176c-17.7 0-32-14.3-32-32s14.3-32 32-32 32 14.3 32 32-14.3 32-32 32zm170.2 154.2C315.8 367.4 282.9 352 248 352c-21.2 0-21.2-32 0-32 44.4 0 86.3 19.6 114.7 53.8 13.8 16.4-11.2 36.5-24.5 20.4z";

/// Loading indicator drawn while an icon is resolving.
pub fn spinner() -> IconDefinition {
    IconDefinition::new(
        "fas",
        "circle-notch",
        IconGeometry::new(512, 512, PathData::Single(SPINNER_PATH.to_string())),
    )
}

/// Shown when a search has no results.
pub fn sad_tear() -> IconDefinition {
    let mut geometry = IconGeometry::new(496, 512, PathData::Single(SAD_TEAR_PATH.to_string()));
    geometry.unicode = Some("f5b4".to_string());
    IconDefinition::new("fas", "sad-tear", geometry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sad_tear_geometry() {
        let icon = sad_tear();
        assert_eq!(icon.name, "sad-tear");
        assert_eq!(icon.geometry.width, 496);
        assert_eq!(icon.geometry.unicode.as_deref(), Some("f5b4"));
    }

    #[test]
    fn spinner_is_square() {
        let icon = spinner();
        assert_eq!((icon.geometry.width, icon.geometry.height), (512, 512));
        assert!(!icon.geometry.path.is_duotone());
    }
}
