//! Room configuration.

/// Settings shared by every room the registry spawns.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Capacity of each room actor's command channel. When it fills up,
    /// callers wait (backpressure) instead of queueing without bound.
    pub channel_size: usize,

    /// Seed for the round RNG. `None` seeds from the OS; tests pin it to
    /// make draws reproducible.
    pub seed: Option<u64>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            channel_size: 64,
            seed: None,
        }
    }
}
