//! 세션 키 발급.

use snapfield_core::models::session::SessionKey;

/// 새 세션 키 (`{prefix}-{밀리초 타임스탬프}-{16진 난수}`)
///
/// 추출 시도마다 새 키를 발급하므로 같은 키에 두 작성자가 경쟁하지 않는다.
pub fn generate_key(prefix: &str) -> SessionKey {
    let millis = chrono::Utc::now().timestamp_millis();
    let nonce: u64 = rand::random();
    SessionKey::from_raw(format!("{prefix}-{millis}-{nonce:x}"))
}
