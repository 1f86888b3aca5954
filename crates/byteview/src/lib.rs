// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! An immutable, cheaply clonable view over cached bytes or strings.
//!
//! [`ByteView`] is how cached values travel between the local cache, the request coalescer and the
//! peer protocol. It wraps either [`Bytes`][bytes::Bytes] or a shared string, so cloning and slicing
//! never copy the payload, while the absence of any mutable accessor guarantees that a value held by
//! the cache cannot be changed behind its back.
//!
//! # Example
//!
//! ```
//! use byteview::ByteView;
//!
//! let view = ByteView::from("hello, world");
//! let world = view.slice_from(7);
//!
//! assert_eq!(world, "world");
//! assert_eq!(world.at(0), b'w');
//!
//! // Handing out mutable data always copies.
//! let mut owned = world.to_vec();
//! owned[0] = b'W';
//! assert_eq!(world, "world");
//! ```

mod error;
mod view;

pub use error::ByteViewError;
pub use view::ByteView;
