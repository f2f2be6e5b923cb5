//! HTTP client for the Stable Diffusion generation service.
//!
//! The service exposes a small REST surface: `GET /health`,
//! `POST /generate` (returns a server-side filename), `GET
//! /image/{filename}` (raw image bytes), and best-effort `POST /unload`
//! / `POST /cancel` signals. This crate wraps that surface with
//! [`SdApiClient`] and exposes the [`PosterGenerator`] trait the worker
//! loop consumes, so tests can substitute a scripted fake.

pub mod api;
pub mod generator;

pub use api::{GenerateRequest, GenerateResponse, HealthResponse, SdApiClient, SdApiError};
pub use generator::{random_seed, GeneratedPoster, PosterGenerator};
