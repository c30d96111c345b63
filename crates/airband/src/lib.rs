//! Airband — background live-stream playback core
//!
//! Keeps an internet radio (HLS) stream alive across network drops, app
//! backgrounding, remote lock-screen controls, and transient server errors,
//! persisting just enough state to resume correctly after a cold restart.
//!
//! The host application supplies the seams: a media engine over the OS
//! audio/media-session runtime ([`engine::MediaEngine`]), durable key/value
//! storage ([`persist::StateStore`]), a connectivity probe
//! ([`connectivity::ConnectivityProbe`]), and channel data pushed into
//! [`registry::ChannelRegistry`] whenever channel metadata loads.

pub mod classify;
pub mod config;
pub mod connectivity;
pub mod controller;
pub mod engine;
pub mod error;
pub mod persist;
pub mod recovery;
pub mod registry;
pub mod state;
pub mod stream_url;
