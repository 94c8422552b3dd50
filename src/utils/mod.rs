pub mod db_utils;
pub mod qr_lookup;
pub mod time;
