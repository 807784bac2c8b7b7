mod handler;
mod model;

pub use handler::{
    list_photos, list_pins, photo_image, place_pin, refresh, remove_pin, select_pin, status,
};
pub use model::{ImageQuery, PhotoGrid, PhotoSlot, PinInfo, PinRequest};
