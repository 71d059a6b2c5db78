//! Headless core of the tuner widget.
//!
//! Everything that decides *what* plays lives here: the station registry, the
//! playback coordinator and its registered surfaces, the station switch
//! sequencer, the card player set, the narrative section and the cosmetic
//! spectrum generator. The terminal front-end only renders [`TunerSnapshot`]s
//! and sends [`Command`]s.

pub mod cards;
pub mod config;
pub mod coordinator;
pub mod dial;
pub mod engine;
pub mod error;
pub mod media;
pub mod narrative;
pub mod platform;
pub mod protocol;
pub mod sequencer;
pub mod spectrum;
pub mod station;
pub mod surface;

pub use engine::TunerEngine;
pub use error::{MediaError, TunerError};
pub use protocol::{Command, TunerSnapshot};
pub use station::LoveChoice;
