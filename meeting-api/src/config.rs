/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Application configuration loaded from environment variables (spec §6
//! "Environment variables (core)").

use std::env;

/// Configuration for the Meeting Backend API.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP server, e.g. `"0.0.0.0:8081"`.
    pub listen_addr: String,
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Redis connection string backing presence cache and the job queue.
    pub redis_url: String,
    /// Shared secret used to sign bearer access tokens (HMAC-SHA256).
    pub jwt_secret: String,
    /// Origin allowed through CORS (`CLIENT_URL`).
    pub client_url: String,
    pub turn: Option<TurnConfig>,
    pub email: Option<EmailConfig>,
    /// API key for the minutes-generation LLM. `None` disables minutes
    /// generation (the endpoint returns `Unavailable`).
    pub gemini_api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TurnConfig {
    pub url: String,
    pub username: String,
    pub credential: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Required
    /// - `DATABASE_URL`, `JWT_SECRET`
    ///
    /// # Optional
    /// - `REDIS_URL` (default: `"redis://127.0.0.1:6379"`; unreachable at
    ///   startup degrades the presence cache and queue to in-memory, it does
    ///   not fail startup)
    /// - `PORT` / `LISTEN_ADDR` (default: `"0.0.0.0:8081"`)
    /// - `CLIENT_URL` (default: `"*"`, development only)
    /// - `TURN_SERVER_URL`, `TURN_USERNAME`, `TURN_CREDENTIAL`
    /// - `EMAIL_HOST`, `EMAIL_PORT`, `EMAIL_USER`, `EMAIL_PASS`
    /// - `GEMINI_API_KEY`
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable is required")?;
        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| "JWT_SECRET environment variable is required")?;

        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let listen_addr = match env::var("PORT").ok().filter(|s| !s.is_empty()) {
            Some(port) => format!("0.0.0.0:{port}"),
            None => env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8081".to_string()),
        };

        let client_url = env::var("CLIENT_URL").unwrap_or_else(|_| "*".to_string());

        let turn = env::var("TURN_SERVER_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|url| TurnConfig {
                url,
                username: env::var("TURN_USERNAME").unwrap_or_default(),
                credential: env::var("TURN_CREDENTIAL").unwrap_or_default(),
            });

        let email = env::var("EMAIL_HOST")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|host| -> Result<EmailConfig, String> {
                let port = env::var("EMAIL_PORT")
                    .unwrap_or_else(|_| "587".to_string())
                    .parse::<u16>()
                    .map_err(|_| "EMAIL_PORT must be a valid port number".to_string())?;
                Ok(EmailConfig {
                    host,
                    port,
                    user: env::var("EMAIL_USER").unwrap_or_default(),
                    pass: env::var("EMAIL_PASS").unwrap_or_default(),
                })
            })
            .transpose()?;

        let gemini_api_key = env::var("GEMINI_API_KEY").ok().filter(|s| !s.is_empty());

        Ok(Self {
            listen_addr,
            database_url,
            redis_url,
            jwt_secret,
            client_url,
            turn,
            email,
            gemini_api_key,
        })
    }
}
