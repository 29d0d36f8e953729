use time::OffsetDateTime;

#[derive(serde::Serialize, serde::Deserialize, Debug)]
enum TokenVersioned {
    // Never remove variants from this enum, or the tag on the wire goes out of sync.
    // Never edit existing versions directly.
    // Instead:
    //
    // - edit `StoredToken` fields
    // - add new `V(last+1)` variant, copy-paste `StoredToken` fields into it
    // - edit `StoredToken::serialize` changing `V(prev)` to the new `V(new)`
    // - add match arms and fix destructurings and struct instantiation until code compiles
    V1 {
        access_token: String,
        expires_at_unix: i64,
    },
}

/// Search API access token, as cached in memory and in the database.
#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(from = "TokenVersioned")]
pub struct StoredToken {
    // DO NOT EDIT directly, see TokenVersioned.
    pub access_token: String,
    pub expires_at: OffsetDateTime,
}

impl StoredToken {
    /// Still usable at `now`, with `margin` to spare.
    pub fn is_fresh(&self, now: OffsetDateTime, margin: time::Duration) -> bool {
        self.expires_at - margin > now
    }
}

impl serde::Serialize for StoredToken {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Change this to `V(latest)` when changing `StoredToken`.
        let ver = TokenVersioned::V1 {
            access_token: self.access_token.clone(),
            expires_at_unix: self.expires_at.unix_timestamp(),
        };
        serde::Serialize::serialize(&ver, serializer)
    }
}

impl From<TokenVersioned> for StoredToken {
    fn from(ver: TokenVersioned) -> Self {
        match ver {
            TokenVersioned::V1 {
                access_token,
                expires_at_unix,
            } => StoredToken {
                access_token,
                // out of range reads as long expired, forcing a refresh
                expires_at: OffsetDateTime::from_unix_timestamp(expires_at_unix)
                    .unwrap_or(OffsetDateTime::UNIX_EPOCH),
            },
            // Add new `V(n)` variants here.
        }
    }
}
