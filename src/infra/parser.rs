use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

/// 文字列を日付型に変換するヘルパー関数
///
/// `dateparser`クレートを利用して、Notionの日付プロパティが返す文字列を解析し、
/// `DateTime<Utc>`型に変換する。
///
/// **この関数の意義**
/// `dateparser::parse`で行われないwith_timezoneでUTCへの変換を行なってる。
/// Notionは日付のみ（"2025-01-15"）と日時付き（"2025-01-15T10:00:00.000+09:00"）の
/// 両方を返すため、形式の違いをこの関数で吸収する。
///
/// # サポート形式の例
/// - "2025-01-15"
/// - "2025-01-15T10:00:00Z"
/// - "2025-01-15T10:00:00.000+09:00"
///
/// # 引数
/// - `date_str`: 解析対象の日付文字列
///
/// # 戻り値
/// - `Ok(DateTime<Utc>)`: 解析が成功した場合
/// - `Err(anyhow::Error)`: 解析に失敗した場合
pub fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    match dateparser::parse(date_str) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(_) => Err(anyhow!("不正な日付形式: {}", date_str)),
    }
}
