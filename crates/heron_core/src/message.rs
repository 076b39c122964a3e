//! Message Types for Thread Communication
//!
//! Commands flow from UI thread -> Analyzer thread
//! Events flow from Analyzer thread -> UI thread

use heron_dsp::{FftOrder, PathBounds};
use serde::{Deserialize, Serialize};

/// Commands sent from the UI thread to the analyzer thread
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Drawing area for the spectrum paths changed
    SetBounds(PathBounds),

    /// Switch transform size on both channels
    SetFftOrder(FftOrder),

    /// Stop the analyzer thread
    Shutdown,
}

/// Events sent from the analyzer thread to the UI thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// Analyzer thread is running
    Started { fft_size: usize, sample_rate: f32 },

    /// Analyzer thread exited
    Stopped,

    /// Transform size changed
    FftOrderChanged(FftOrder),

    /// Sample blocks lost on `channel` since the last report
    BlocksDropped { channel: usize, count: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = Event::BlocksDropped {
            channel: 1,
            count: 7,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("BlocksDropped"));

        let deserialized: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[test]
    fn test_fft_order_event_round_trip() {
        let event = Event::FftOrderChanged(FftOrder::Order4096);
        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }
}
