//! Message Types for Thread Communication
//!
//! Commands flow from UI thread -> Analysis thread
//! Events flow from Analysis thread -> UI thread

use serde::{Deserialize, Serialize};

use eqscope_dsp::{ChainSettings, PlotBounds, Point};

/// Commands sent from the UI thread to the analysis thread
#[derive(Debug, Clone)]
pub enum Command {
    /// The editor was resized; regenerate paths for the new rectangle
    SetPlotBounds(PlotBounds),

    /// Turn the spectrum analyzer on or off
    SetAnalyzerEnabled(bool),

    /// Rebuild filters and the response curve on the next tick
    Refresh,

    /// Shutdown the analysis thread
    Shutdown,
}

/// Events sent from the analysis thread to the UI thread
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// Analysis thread started
    Started,

    /// Analysis thread stopped
    Stopped,

    /// New coefficients were published to the audio thread
    FiltersUpdated { settings: ChainSettings },

    /// The static response overlay was recomputed
    ResponseCurveUpdated { points: Vec<Point> },

    /// A fresh spectrum path is available for one channel
    SpectrumUpdated { channel: usize, points: Vec<Point> },

    /// Error occurred
    Error { message: String },
}

impl Event {
    /// Create an error event from any error type
    pub fn error<E: std::fmt::Display>(err: E) -> Self {
        Event::Error {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = Event::SpectrumUpdated {
            channel: 1,
            points: vec![Point { x: 0.0, y: 10.0 }, Point { x: 4.0, y: 12.5 }],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("SpectrumUpdated"));
        assert!(json.contains("payload"));

        let deserialized: Event = serde_json::from_str(&json).unwrap();
        if let Event::SpectrumUpdated { channel, points } = deserialized {
            assert_eq!(channel, 1);
            assert_eq!(points.len(), 2);
            assert_eq!(points[1].y, 12.5);
        } else {
            panic!("Deserialization produced wrong variant");
        }
    }

    #[test]
    fn test_error_event() {
        let event = Event::error("Test error message");
        if let Event::Error { message } = event {
            assert_eq!(message, "Test error message");
        } else {
            panic!("Should be Error variant");
        }
    }

    #[test]
    fn test_filters_updated_serialization() {
        let settings = ChainSettings {
            peak_gain_db: 6.0,
            ..Default::default()
        };
        let json = serde_json::to_string(&Event::FiltersUpdated { settings }).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        if let Event::FiltersUpdated { settings: restored } = deserialized {
            assert_eq!(restored, settings);
        } else {
            panic!("Wrong variant");
        }
    }
}
