mod client;

pub use client::{sha1_hex, write_file, DownloadEntry, Downloader};
