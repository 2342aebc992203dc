pub mod kasa;
pub mod tcp;
