pub mod licence;
