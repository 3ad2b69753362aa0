pub mod exif;
pub mod formatter;
pub mod gps;
pub mod tags;
pub mod value;
