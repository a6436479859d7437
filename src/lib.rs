//! # modzip: In-Memory ZIP Container Engine
//!
//! `modzip` parses, builds and mutates PKZIP archives held in memory. It is
//! aimed at mod JARs and modpack exports: open an archive, look at or change
//! its entries, extract it safely, and write it back out.
//!
//! ## Features
//!
//! - **Lazy Parsing**: Only the end record is read at open time; the central directory is walked on first access
//! - **Verbatim Copy**: Unchanged entries are copied byte-for-byte on rewrite, never recompressed
//! - **Zip64**: Read and write archives past the 4 GiB / 65535-entry limits
//! - **ZipCrypto**: Decrypt and encrypt with the traditional PKWARE cipher
//! - **Data Descriptors**: Tolerates the signed, unsigned and 64-bit descriptor layouts found in the wild
//! - **Safe Extraction**: Entry names that would escape the target directory are rejected
//! - **Async**: Tokio-based open/serialize/write (feature `async`)
//!
//! ## Quick Start
//!
//! ### Reading an archive
//!
//! ```no_run
//! use modzip::ZipFile;
//!
//! let mut zip = ZipFile::open("mod.jar")?;
//!
//! for entry in zip.entries()? {
//!     println!("{}: {} bytes", entry.name(), entry.size());
//! }
//!
//! let manifest = zip.read_entry("META-INF/MANIFEST.MF", None)?;
//! # Ok::<(), modzip::ZipError>(())
//! ```
//!
//! ### Building an archive
//!
//! ```no_run
//! use modzip::ZipFile;
//!
//! let mut zip = ZipFile::new();
//! zip.add_entry("modpack.json", br#"{"name":"demo"}"#.to_vec(), None, None)?;
//! zip.add_entry("overrides/config/client.toml", b"fov = 90".to_vec(), None, Some(0o644))?;
//! zip.add_encrypted_entry("secrets.txt", b"token".to_vec(), "p@ss")?;
//! zip.set_comment("exported by launcher")?;
//!
//! zip.write_to_path("demo.zip")?;
//! # Ok::<(), modzip::ZipError>(())
//! ```
//!
//! ### Extracting
//!
//! ```no_run
//! use modzip::{ExtractOptions, ZipFile};
//!
//! let mut zip = ZipFile::open("modpack.zip")?;
//! let report = zip.extract_all("instance/", &ExtractOptions::new().with_overwrite(true))?;
//! for (name, err) in &report.failed {
//!     eprintln!("{}: {}", name, err);
//! }
//! # Ok::<(), modzip::ZipError>(())
//! ```

pub mod archive;
pub mod cipher;
pub mod codec;
pub mod crc;
pub mod dostime;
pub mod entry;
pub mod error;
pub mod extract;
pub mod header;
pub mod options;
pub mod path;
pub mod zipfile;

#[cfg(feature = "async")]
pub mod async_zipfile;

pub use archive::{Archive, MainHeader};
pub use cipher::{FixedRandom, OsRandom, RandomSource};
pub use codec::CompressionMethod;
pub use dostime::DosDateTime;
pub use entry::{Payload, ZipEntry};
pub use error::{Result, ZipError};
pub use extract::ExtractReport;
pub use options::{ArchiveOptions, ExtractOptions};
pub use zipfile::ZipFile;

#[cfg(feature = "async")]
pub use async_zipfile::SerializeEvent;
