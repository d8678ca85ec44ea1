//! Window-scope persisted UI preferences: the localStorage keys and the
//! validation rules applied when reading them back. Storage writes are
//! best-effort; any value that fails validation falls back to its default.

pub const KEY_ADMIN_UNLOCKED: &str = "ADMIN_UNLOCKED";
pub const KEY_API_URL: &str = "API_URL";
pub const KEY_SIDEBAR_WIDTH: &str = "ragai.sidebar.width";
pub const KEY_SIDEBAR_COLLAPSED: &str = "ragai.sidebar.collapsed";
pub const KEY_LOWER_PRIORITY_EXPANDED: &str = "dataTab.lowerPriority.expanded";
pub const KEY_LOWER_PRIORITY_PAGE_SIZE: &str = "dataTab.lowerPriority.pageSize";

pub const SIDEBAR_MIN_WIDTH: i32 = 240;
pub const SIDEBAR_MAX_WIDTH: i32 = 520;
pub const SIDEBAR_DEFAULT_WIDTH: i32 = 320;
/// Fixed width while collapsed; the expanded preference is kept alongside.
pub const SIDEBAR_COLLAPSED_WIDTH: i32 = 52;

pub const PAGE_SIZES: [usize; 4] = [10, 25, 50, 100];
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// A stored sidebar width outside the allowed range (or unparsable) reads
/// back as the default, not as the nearest bound.
pub fn sidebar_width_from_storage(raw: Option<&str>) -> i32 {
    raw.and_then(|value| value.trim().parse::<i32>().ok())
        .filter(|width| (SIDEBAR_MIN_WIDTH..=SIDEBAR_MAX_WIDTH).contains(width))
        .unwrap_or(SIDEBAR_DEFAULT_WIDTH)
}

/// Live-drag clamping keeps the handle inside the bounds.
pub fn clamp_drag_width(width: i32) -> i32 {
    width.clamp(SIDEBAR_MIN_WIDTH, SIDEBAR_MAX_WIDTH)
}

/// Page size must come from the fixed selector set.
pub fn page_size_from_storage(raw: Option<&str>) -> usize {
    raw.and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|size| PAGE_SIZES.contains(size))
        .unwrap_or(DEFAULT_PAGE_SIZE)
}

pub fn flag_from_storage(raw: Option<&str>) -> bool {
    matches!(raw, Some("true") | Some("1"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidebar_width_outside_range_reads_as_default() {
        assert_eq!(sidebar_width_from_storage(Some("300")), 300);
        assert_eq!(sidebar_width_from_storage(Some("240")), 240);
        assert_eq!(sidebar_width_from_storage(Some("520")), 520);
        assert_eq!(sidebar_width_from_storage(Some("600")), SIDEBAR_DEFAULT_WIDTH);
        assert_eq!(sidebar_width_from_storage(Some("100")), SIDEBAR_DEFAULT_WIDTH);
        assert_eq!(sidebar_width_from_storage(Some("wide")), SIDEBAR_DEFAULT_WIDTH);
        assert_eq!(sidebar_width_from_storage(None), SIDEBAR_DEFAULT_WIDTH);
    }

    #[test]
    fn drag_width_clamps_to_bounds() {
        assert_eq!(clamp_drag_width(100), SIDEBAR_MIN_WIDTH);
        assert_eq!(clamp_drag_width(600), SIDEBAR_MAX_WIDTH);
        assert_eq!(clamp_drag_width(400), 400);
    }

    #[test]
    fn page_size_is_restricted_to_the_selector_set() {
        for size in PAGE_SIZES {
            assert_eq!(page_size_from_storage(Some(&size.to_string())), size);
        }
        assert_eq!(page_size_from_storage(Some("33")), DEFAULT_PAGE_SIZE);
        assert_eq!(page_size_from_storage(Some("x")), DEFAULT_PAGE_SIZE);
        assert_eq!(page_size_from_storage(None), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn flags_parse_truthy_strings_only() {
        assert!(flag_from_storage(Some("true")));
        assert!(flag_from_storage(Some("1")));
        assert!(!flag_from_storage(Some("false")));
        assert!(!flag_from_storage(None));
    }
}
