use bytes::Bytes;

/// What the caller hands the pipeline.
#[derive(Debug, Clone)]
pub enum MediaRef {
    /// Raw bytes with their declared MIME type.
    Inline { data: Bytes, mime_type: String },
    /// A key in the configured object store.
    Stored { key: String },
    /// An access URL previously produced for a stored object.
    Url { url: String },
}

impl MediaRef {
    pub fn inline(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        MediaRef::Inline {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn stored(key: impl Into<String>) -> Self {
        MediaRef::Stored { key: key.into() }
    }

    pub fn url(url: impl Into<String>) -> Self {
        MediaRef::Url { url: url.into() }
    }
}
