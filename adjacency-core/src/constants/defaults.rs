//! Configuration Defaults
//!
//! Values applied when the host configuration record leaves a field out.
//! They are conservative: proximity needs a few fresh fixes on both sides
//! before an enter notification goes out.

// ===== HYSTERESIS =====

/// Distance at or below which proximity is entered (meters).
pub const DEFAULT_ENTRY_THRESHOLD_M: f64 = 500.0;

/// Distance at or above which proximity is left (meters).
///
/// The 200 m gap to the entry threshold absorbs typical phone GPS jitter.
pub const DEFAULT_EXIT_THRESHOLD_M: f64 = 700.0;

/// Delay between a subject change and the recompute it triggers (seconds).
pub const DEFAULT_DEBOUNCE_SECONDS: u64 = 2;

/// Largest accepted accuracy radius (meters). Zero disables the filter.
pub const DEFAULT_MAX_ACCURACY_M: f64 = 200.0;

/// Display distances in meters even above one kilometer.
pub const DEFAULT_FORCE_METERS: bool = false;

// ===== MOVEMENT FILTER =====

/// Silence after which the next fix is treated as a resync (seconds).
pub const DEFAULT_RESYNC_SILENCE_S: u64 = 600;

/// Hold window after a resync during which fixes are ignored (seconds).
pub const DEFAULT_RESYNC_HOLD_S: u64 = 60;

/// Largest plausible subject speed (km/h). Zero disables the filter.
pub const DEFAULT_MAX_SPEED_KMH: f64 = 150.0;

// ===== RELIABILITY =====

/// Accepted updates each side needs inside the window.
pub const DEFAULT_MIN_UPDATES_FOR_PROXIMITY: u32 = 3;

/// Window for counting recent updates (seconds).
pub const DEFAULT_UPDATE_WINDOW_S: u64 = 300;

/// Only fire the enter notification when the verdict is reliable.
pub const DEFAULT_REQUIRE_RELIABLE_PROXIMITY: bool = true;

/// History entries kept per subject regardless of window length.
pub const MAX_UPDATE_HISTORY: usize = 64;

// ===== BUCKETS =====

/// Default distance buckets as (exclusive upper bound in meters, name).
pub const DEFAULT_BUCKETS: [(f64, &str); 5] = [
    (50.0, "very_near"),
    (200.0, "near"),
    (1000.0, "mid"),
    (5000.0, "far"),
    (f64::INFINITY, "very_far"),
];

/// Bucket table capacity.
pub const MAX_BUCKETS: usize = 8;

// ===== SUBJECT NAMING =====

/// Suffix stripped from geocoded-location subject ids when building pair keys.
pub const GEOCODED_SUFFIX: &str = "_geocoded_location";

// ===== NOTIFICATIONS =====

/// Proximity entered with a reliable verdict (or gating disabled).
pub const EVENT_ENTER: &str = "member_adjacency_enter";

/// Proximity left.
pub const EVENT_LEAVE: &str = "member_adjacency_leave";

/// Periodic update while staying in proximity.
pub const EVENT_PROXIMITY_UPDATE: &str = "member_adjacency_proximity_update";

/// Proximity entered but the verdict was unreliable.
pub const EVENT_ENTER_UNRELIABLE: &str = "member_adjacency_enter_unreliable";

/// First target of an anchor entered proximity.
pub const EVENT_ANY_ENTER: &str = "member_adjacency_any_enter";

/// Last target of an anchor left proximity.
pub const EVENT_ANY_LEAVE: &str = "member_adjacency_any_leave";
