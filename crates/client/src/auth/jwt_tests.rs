// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use super::{decode_claims, epoch_secs};

fn make_token(sub: &str, username: &str, email: &str, exp: u64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::json!({ "sub": sub, "username": username, "email": email, "exp": exp })
            .to_string(),
    );
    format!("{header}.{payload}.unsigned")
}

#[test]
fn decodes_claims_exactly() -> anyhow::Result<()> {
    let exp = epoch_secs() + 3600;
    let token = make_token("u-1", "alice", "alice@example.com", exp);

    let claims = decode_claims(&token)?;
    assert_eq!(claims.sub, "u-1");
    assert_eq!(claims.username, "alice");
    assert_eq!(claims.email, "alice@example.com");
    assert_eq!(claims.exp, exp);
    assert!(!claims.is_expired(epoch_secs()));
    Ok(())
}

#[test]
fn past_exp_is_expired() -> anyhow::Result<()> {
    let token = make_token("u-1", "alice", "a@b.c", epoch_secs() - 10);
    let claims = decode_claims(&token)?;
    assert!(claims.is_expired(epoch_secs()));
    Ok(())
}

#[test]
fn exp_equal_to_now_counts_as_expired() -> anyhow::Result<()> {
    let now = epoch_secs();
    let claims = decode_claims(&make_token("u", "n", "e", now))?;
    assert!(claims.is_expired(now));
    Ok(())
}

#[test]
fn malformed_tokens_error_without_panicking() {
    assert!(decode_claims("").is_err());
    assert!(decode_claims("only-one-segment").is_err());
    assert!(decode_claims("a.!!!not-base64!!!.c").is_err());

    // Valid base64 but not a claims object.
    let payload = URL_SAFE_NO_PAD.encode(b"[1,2,3]");
    assert!(decode_claims(&format!("h.{payload}.s")).is_err());
}
