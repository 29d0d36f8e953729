//! Small sled-backed store for state that should survive a restart.

use bincode::Options;
use thiserror::Error;

mod token;
pub use self::token::StoredToken;

const SEARCH_TOKEN_KEY: &[u8] = b"search-api";

#[derive(Error, Debug)]
pub enum DbError {
    #[error("database error: {0}")]
    DB(#[from] sled::Error),

    #[error("error encoding: {0}")]
    Encoding(#[from] bincode::Error),
}

fn bincode_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_limit(10000)
        .reject_trailing_bytes()
        .with_varint_encoding()
        .with_big_endian()
}

#[derive(Clone)]
pub struct TokenDb {
    tree: sled::Tree,
}

impl TokenDb {
    pub fn open(path: &std::path::Path) -> Result<Self, DbError> {
        let db = sled::open(path)?;
        let tree = db.open_tree("tokens")?;
        Ok(Self::new(tree))
    }

    pub fn new(tree: sled::Tree) -> Self {
        Self { tree }
    }

    pub fn get(&self) -> Result<Option<StoredToken>, DbError> {
        match self.tree.get(SEARCH_TOKEN_KEY)? {
            None => Ok(None),
            Some(buf) => {
                let token: StoredToken = bincode_options().deserialize(&buf)?;
                Ok(Some(token))
            }
        }
    }

    pub fn put(&self, token: &StoredToken) -> Result<(), DbError> {
        let buf = bincode_options().serialize(token)?;
        let _ = self.tree.insert(SEARCH_TOKEN_KEY, buf)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), DbError> {
        let _ = self.tree.remove(SEARCH_TOKEN_KEY)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn temporary() -> TokenDb {
    let db = sled::Config::new()
        .temporary(true)
        .open()
        .expect("temporary sled database");
    TokenDb::new(db.open_tree("tokens").expect("open tree"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Duration, OffsetDateTime};

    #[test]
    fn empty_database_has_no_token() {
        assert_eq!(temporary().get().unwrap(), None);
    }

    #[test]
    fn token_survives_reopen_of_tree() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let expires_at = OffsetDateTime::from_unix_timestamp(1_900_000_000).unwrap();
        let token = StoredToken {
            access_token: "abc".to_string(),
            expires_at,
        };
        TokenDb::new(db.open_tree("tokens").unwrap())
            .put(&token)
            .unwrap();

        let again = TokenDb::new(db.open_tree("tokens").unwrap());
        assert_eq!(again.get().unwrap(), Some(token));
    }

    #[test]
    fn freshness_honors_margin() {
        let now = OffsetDateTime::from_unix_timestamp(1_000_000).unwrap();
        let token = StoredToken {
            access_token: "abc".to_string(),
            expires_at: now + Duration::seconds(60),
        };
        assert!(token.is_fresh(now, Duration::seconds(30)));
        assert!(!token.is_fresh(now, Duration::seconds(60)));
        assert!(!token.is_fresh(now + Duration::seconds(45), Duration::seconds(30)));
    }

    #[test]
    fn corrupt_value_is_an_error() {
        let db = temporary();
        db.tree.insert(SEARCH_TOKEN_KEY, &b"\xff\xff"[..]).unwrap();
        assert!(matches!(db.get(), Err(DbError::Encoding(_))));
    }
}
