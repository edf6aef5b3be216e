//! Configuration for sinks and duplex streams.

/// Stream configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Close the connection once the sink's input sequence ends.
    ///
    /// Set to `false` when inbound traffic must continue after this side
    /// has finished writing.
    ///
    /// Default: true
    pub close_on_end: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { close_on_end: true }
    }
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether the sink closes the connection when its input ends.
    #[must_use]
    pub const fn with_close_on_end(mut self, close_on_end: bool) -> Self {
        self.close_on_end = close_on_end;
        self
    }

    /// Configure a sink that leaves the connection open when its input ends.
    #[must_use]
    pub fn keep_open() -> Self {
        Self {
            close_on_end: false,
        }
    }
}
