//! Signed reminders
//!
//! A reminder is a named dataset handed to an untrusted client and accepted
//! back only if it is unmodified. The token is two length-prefixed fields,
//! a raw HMAC-SHA256 and the body it covers:
//!
//! ```text
//! token = DEC "." MAC DEC "." BODY
//! body  = DEC "." NAME "(" ENCODED_TREE ")"
//! ```
//!
//! The MAC covers every byte of the body, name included. Validation checks
//! the MAC before decoding anything inside the body, so an unauthenticated
//! body never reaches the tree decoder.

mod key;

pub use key::{KeyProvider, ReminderKey, SessionKeys, GENERATED_KEY_LEN};

use fiz_codec::{FieldReader, FieldWriter};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::codec::{read_tree, write_tree};
use crate::dataset::{Dataset, Lookup, Query, Value};
use crate::error::{DatasetError, DatasetResult};

/// HMAC-SHA256 output length in bytes
pub const MAC_LEN: usize = 32;

/// Build a signed token carrying `body` under `name`.
pub fn build_token(name: &str, body: &Dataset, key: &ReminderKey) -> DatasetResult<Vec<u8>> {
    let mut body_writer = FieldWriter::new();
    body_writer.str_field(name);
    write_tree(&mut body_writer, body)?;
    let body_bytes = body_writer.into_bytes();

    let mac = key.mac(&body_bytes)?;
    let mut token = FieldWriter::with_capacity(body_bytes.len() + MAC_LEN + 8);
    token.field(&mac).field(&body_bytes);
    Ok(token.into_bytes())
}

/// Check a token's MAC and decode its body.
///
/// Malformed framing is `Syntax`. A MAC of the wrong length or a MAC that
/// does not match is `Authentication`.
pub fn validate_token(token: &[u8], key: &ReminderKey) -> DatasetResult<(String, Dataset)> {
    let mut reader = FieldReader::new(token);
    let claimed = reader.read_field()?;
    let body = reader.read_field()?;
    reader.finish()?;

    if claimed.len() != MAC_LEN {
        warn!(
            mac_len = claimed.len(),
            key = %key.fingerprint(),
            "rejected reminder with wrong MAC length"
        );
        return Err(DatasetError::Authentication(format!(
            "MAC is {} bytes, expected {}",
            claimed.len(),
            MAC_LEN
        )));
    }
    if !key.verify(body, claimed)? {
        warn!(key = %key.fingerprint(), "rejected reminder with mismatched MAC");
        return Err(DatasetError::Authentication("MAC does not match".to_string()));
    }

    let mut body_reader = FieldReader::new(body);
    let name = body_reader.read_str()?.to_string();
    let tree = read_tree(&mut body_reader)?;
    body_reader.finish()?;
    debug!(body_len = body.len(), "reminder validated");
    Ok((name, tree))
}

/// A named dataset that round-trips through a signed token.
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    name: String,
    body: Dataset,
}

impl Reminder {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_body(name, Dataset::new())
    }

    pub fn with_body(name: impl Into<String>, body: Dataset) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &Dataset {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Dataset {
        &mut self.body
    }

    pub fn into_body(self) -> Dataset {
        self.body
    }

    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> DatasetResult<()> {
        self.body.set(path, value)
    }

    pub fn add(&mut self, path: &str, value: impl Into<Value>) -> DatasetResult<()> {
        self.body.add(path, value)
    }

    pub fn to_token(&self, key: &ReminderKey) -> DatasetResult<Vec<u8>> {
        build_token(&self.name, &self.body, key)
    }

    pub fn from_token(token: &[u8], key: &ReminderKey) -> DatasetResult<Self> {
        let (name, body) = validate_token(token, key)?;
        Ok(Self { name, body })
    }
}

impl Lookup for Reminder {
    fn resolve(&self, query: &Query<'_>, depth: usize, out: &mut Vec<Value>) -> DatasetResult<()> {
        self.body.resolve(query, depth, out)
    }
}

/// Several independently signed reminders, addressed by name.
///
/// A later reminder with the same name replaces an earlier one.
#[derive(Debug, Clone, Default)]
pub struct ReminderSet {
    reminders: IndexMap<String, Reminder>,
}

impl ReminderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate every token; the first bad one fails the whole set.
    pub fn from_tokens<I, T>(tokens: I, key: &ReminderKey) -> DatasetResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut set = Self::new();
        for token in tokens {
            set.insert_token(token.as_ref(), key)?;
        }
        Ok(set)
    }

    /// Validate one token and add the reminder it carries.
    pub fn insert_token(&mut self, token: &[u8], key: &ReminderKey) -> DatasetResult<&Reminder> {
        let reminder = Reminder::from_token(token, key)?;
        let name = reminder.name.clone();
        self.reminders.insert(name.clone(), reminder);
        self.reminders
            .get(&name)
            .ok_or_else(|| DatasetError::Internal(format!("reminder \"{}\" vanished", name)))
    }

    pub fn insert(&mut self, reminder: Reminder) -> Option<Reminder> {
        self.reminders.insert(reminder.name.clone(), reminder)
    }

    pub fn get(&self, name: &str) -> Option<&Reminder> {
        self.reminders.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Reminder> {
        self.reminders.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.reminders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reminders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reminder> {
        self.reminders.values()
    }

    /// Sign every reminder, in insertion order.
    pub fn to_tokens(&self, key: &ReminderKey) -> DatasetResult<Vec<Vec<u8>>> {
        self.reminders.values().map(|r| r.to_token(key)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ReminderKey {
        ReminderKey::new(b"0123456789abcdef0123456789abcdef".to_vec())
    }

    fn cart() -> Reminder {
        let mut reminder = Reminder::new("cart");
        reminder.set("user", "alice").unwrap();
        reminder.add("item.sku", "A-1").unwrap();
        reminder.body_mut().add("item", Dataset::new().with("sku", "B-2")).unwrap();
        reminder
    }

    #[test]
    fn test_token_layout() {
        let token = build_token("n", &Dataset::new().with("k", "v"), &key()).unwrap();
        let body = b"1.n(1.k1.v)";
        assert_eq!(&token[..3], b"32.");
        assert_eq!(&token[3 + MAC_LEN..3 + MAC_LEN + 3], b"11.");
        assert_eq!(&token[3 + MAC_LEN + 3..], body);
        assert_eq!(&token[3..3 + MAC_LEN], &key().mac(body).unwrap());
    }

    #[test]
    fn test_round_trip() {
        let reminder = cart();
        let token = reminder.to_token(&key()).unwrap();
        let back = Reminder::from_token(&token, &key()).unwrap();
        assert_eq!(back, reminder);
        assert_eq!(back.name(), "cart");
        assert_eq!(back.get_strings("item.sku").unwrap(), vec!["A-1", "B-2"]);
    }

    #[test]
    fn test_empty_name_and_body() {
        let token = build_token("", &Dataset::new(), &key()).unwrap();
        let (name, body) = validate_token(&token, &key()).unwrap();
        assert_eq!(name, "");
        assert!(body.is_empty());
    }

    #[test]
    fn test_wrong_key_is_authentication_failure() {
        let token = cart().to_token(&key()).unwrap();
        let err = Reminder::from_token(&token, &ReminderKey::new(b"other".to_vec())).unwrap_err();
        assert!(err.is_authentication());
    }

    #[test]
    fn test_body_tamper_is_authentication_failure() {
        let mut token = cart().to_token(&key()).unwrap();
        let last = token.len() - 3;
        token[last] ^= 0x20;
        assert!(validate_token(&token, &key()).unwrap_err().is_authentication());
    }

    #[test]
    fn test_wrong_mac_length_is_authentication_failure() {
        let mut token = b"4.abcd".to_vec();
        token.extend_from_slice(b"11.1.n(1.k1.v)");
        assert!(validate_token(&token, &key()).unwrap_err().is_authentication());
    }

    #[test]
    fn test_framing_errors_are_syntax() {
        let token = cart().to_token(&key()).unwrap();

        let mut trailing = token.clone();
        trailing.push(b'x');
        assert!(validate_token(&trailing, &key()).unwrap_err().is_syntax());

        let truncated = &token[..token.len() - 1];
        assert!(validate_token(truncated, &key()).unwrap_err().is_syntax());

        assert!(validate_token(b"", &key()).unwrap_err().is_syntax());
        assert!(validate_token(b"032.", &key()).unwrap_err().is_syntax());
    }

    #[test]
    fn test_authenticated_but_malformed_body_is_syntax() {
        // A correctly signed body that is not a valid tree
        let body = b"1.n(1.k";
        let mut token = FieldWriter::new();
        token.field(&key().mac(body).unwrap()).field(body);
        let err = validate_token(token.as_bytes(), &key()).unwrap_err();
        assert!(err.is_syntax());
    }

    #[test]
    fn test_reminder_set() {
        let mut other = Reminder::new("prefs");
        other.set("theme", "dark").unwrap();
        let set = ReminderSet::from_tokens(
            [cart().to_token(&key()).unwrap(), other.to_token(&key()).unwrap()],
            &key(),
        )
        .unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.get("prefs").unwrap().get_string("theme").unwrap(), "dark");
        let names: Vec<&str> = set.iter().map(Reminder::name).collect();
        assert_eq!(names, vec!["cart", "prefs"]);

        let tokens = set.to_tokens(&key()).unwrap();
        let again = ReminderSet::from_tokens(&tokens, &key()).unwrap();
        assert_eq!(again.get("cart"), set.get("cart"));
    }

    #[test]
    fn test_reminder_set_validates_each_token() {
        let good = cart().to_token(&key()).unwrap();
        let bad = cart().to_token(&ReminderKey::new(b"other".to_vec())).unwrap();

        let mut set = ReminderSet::new();
        assert!(set.insert_token(&bad, &key()).is_err());
        assert_eq!(set.insert_token(&good, &key()).unwrap().name(), "cart");
        assert_eq!(set.len(), 1);
        assert!(ReminderSet::from_tokens([good, bad], &key()).is_err());
    }

    #[test]
    fn test_session_keys_scope_tokens() {
        let keys = SessionKeys::new();
        let token = cart().to_token(&keys.key_for("s1")).unwrap();
        assert!(Reminder::from_token(&token, &keys.key_for("s1")).is_ok());
        assert!(Reminder::from_token(&token, &keys.key_for("s2"))
            .unwrap_err()
            .is_authentication());

        keys.end_session("s1");
        assert!(Reminder::from_token(&token, &keys.key_for("s1")).is_err());
    }
}
