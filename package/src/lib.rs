//! Bundle a compact binary object with hash-verified attachments.
//!
//! A [Package] carries an optional root object and any number of [Attachment]s (binary blobs
//! or objects), each stored next to its content hash. Loading a package recomputes every hash
//! and rejects the package as a whole if any of them disagree, so a package received from an
//! untrusted peer is either fully verified or not returned at all.
//!
//! The stream layout tags object attachments differently from existing encoders of this
//! format, so packages are not interchangeable with them. See [Package] for details.
//!
//! # Example
//!
//! ```
//! use compactbin_codec::Writer;
//! use compactbin_cryptography::Blake3;
//! use compactbin_package::{Attachment, Config, Package};
//!
//! let mut writer = Writer::new();
//! writer.begin_object();
//! writer.name("kind").string("build");
//! writer.end_object();
//! let object = writer.save().as_object().unwrap();
//!
//! let mut package = Package::<Blake3>::with_object(&object);
//! let log = Attachment::<Blake3>::binary(b"compiled 12 files".to_vec());
//! let hash = log.hash();
//! package.add_attachment(log);
//!
//! let mut stream = Vec::new();
//! package.save(&mut stream).unwrap();
//!
//! let loaded = Package::<Blake3>::load(&mut stream.as_slice(), &Config::default()).unwrap();
//! assert_eq!(loaded, package);
//! assert!(loaded.find_attachment(&hash).unwrap().is_binary());
//! ```

mod attachment;
pub use attachment::{Attachment, Body};
mod config;
pub use config::Config;
mod error;
pub use error::Error;
mod package;
pub use package::Package;
