use serde::{Deserialize, Serialize};
use urlencoding::encode;

/// ページネーションの1リンク分の情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    pub number: usize,
    pub href: String,
}

/// 一覧ページのパスを生成する
///
/// タグが指定されていればタグで絞り込んだ一覧のパス、空または未指定なら全記事一覧のパスを返す。
/// ページ番号の範囲チェックは行わない（呼び出し側の責務）。
/// タグは1つのパスセグメントになるようパーセントエンコードする（`C/C++` -> `C%2FC%2B%2B`）。
pub fn build_page_link(tag: Option<&str>, page: usize) -> String {
    match tag {
        Some(tag) if !tag.is_empty() => format!("/posts/tag/{}/page/{}", encode(tag), page),
        _ => format!("/posts/page/{}", page),
    }
}

/// ページネーション表示用に1..=number_of_pagesのリンクを並べる
pub fn pagination_links(tag: Option<&str>, number_of_pages: usize) -> Vec<PageLink> {
    (1..=number_of_pages)
        .map(|number| PageLink {
            number,
            href: build_page_link(tag, number),
        })
        .collect()
}

/// URLのタグセグメントをNotion上のタグ名に合わせる
///
/// タグはNotion側で先頭大文字で管理されている前提のため、先頭の1文字だけを大文字にする。
/// 例: "rust" -> "Rust"
pub fn route_tag_to_source_tag(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 記事詳細ページのパス
pub fn build_post_link(slug: &str) -> String {
    format!("/posts/{}", encode(slug))
}
