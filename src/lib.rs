/*
 *  lib.rs
 *
 *  spotmatrix - Spotify now-playing on an RGB LED matrix
 */

pub mod artwork;
pub mod config;
pub mod panel;
pub mod pixel;
pub mod screen;
pub mod spotify;
