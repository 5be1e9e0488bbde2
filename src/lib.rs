pub mod config;
pub mod entities;
pub mod events;
pub mod history;
pub mod slideshow;
pub mod source;
pub mod web;
pub mod tasks {
    pub mod refresher;
}
