/// Game payloads.
pub mod game;
/// Health check payload.
pub mod health;
/// Input checks shared by the request bodies.
pub mod validation;
