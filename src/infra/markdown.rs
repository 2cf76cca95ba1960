//! Notionのブロックツリーをmarkdown文字列に変換するモジュール
//!
//! 変換は2段階で行う。
//! 1. `fetch_block_tree`: 子ブロックを再帰的に取得してツリーを組み立てる（通信あり）
//! 2. `render_markdown`: ツリーを文字列に変換する（純粋関数）

use crate::infra::api::notion::{NotionBlock, NotionClient};
use crate::types::BlogResult;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use tracing::debug;

/// 子要素を含むブロック
#[derive(Debug, Clone, PartialEq)]
pub struct BlockNode {
    pub block: NotionBlock,
    pub children: Vec<BlockNode>,
}

type TreeFuture<'a> = Pin<Box<dyn Future<Output = BlogResult<Vec<BlockNode>>> + Send + 'a>>;

/// 指定ブロック（ページ）配下のブロックツリーを取得する
///
/// `has_more`がfalseになるまでカーソルを辿り、`has_children`のブロックは再帰的に展開する。
pub fn fetch_block_tree<'a, C>(client: &'a C, block_id: &'a str) -> TreeFuture<'a>
where
    C: NotionClient + ?Sized,
{
    Box::pin(async move {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = client
                .list_block_children(block_id, cursor.as_deref())
                .await?;
            blocks.extend(page.results);

            match page.next_cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        let mut nodes = Vec::with_capacity(blocks.len());
        for block in blocks {
            let children = match children_source(&block) {
                Some(source_id) => fetch_block_tree(client, source_id).await?,
                None => Vec::new(),
            };
            nodes.push(BlockNode { block, children });
        }

        Ok(nodes)
    })
}

// 子要素を取得する対象のブロックID
//
// 子ページ・子データベースは本文に含めない（タイトルのみ出力する）ため辿らない。
// 同期ブロックの複製は同期元のブロックから子要素を取得する。
fn children_source(block: &NotionBlock) -> Option<&str> {
    if !block.has_children {
        return None;
    }
    match block.block_type.as_str() {
        "child_page" | "child_database" => None,
        "synced_block" => Some(
            block
                .content()
                .and_then(|c| c.get("synced_from"))
                .and_then(|from| from.get("block_id"))
                .and_then(Value::as_str)
                .unwrap_or(block.id.as_str()),
        ),
        _ => Some(block.id.as_str()),
    }
}

/// ページ本文をmarkdownとして取得する
pub async fn page_to_markdown<C>(client: &C, page_id: &str) -> BlogResult<String>
where
    C: NotionClient + ?Sized,
{
    let tree = fetch_block_tree(client, page_id).await?;
    Ok(render_markdown(&tree))
}

/// ブロックツリーをmarkdown文字列に変換する
///
/// トップレベルのブロックは空行で区切る。未対応のブロック種別は出力しない。
pub fn render_markdown(nodes: &[BlockNode]) -> String {
    nodes
        .iter()
        .filter_map(render_node)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_node(node: &BlockNode) -> Option<String> {
    let block = &node.block;
    let content = block.content();
    let text = content.map(rich_text_field).unwrap_or_default();

    let rendered = match block.block_type.as_str() {
        "paragraph" => with_children(text, &node.children),
        "heading_1" => format!("# {}", text),
        "heading_2" => format!("## {}", text),
        "heading_3" => format!("### {}", text),
        "bulleted_list_item" => list_item("- ", &text, &node.children),
        "numbered_list_item" => list_item("1. ", &text, &node.children),
        "to_do" => {
            let checked = content
                .and_then(|c| c.get("checked"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let marker = if checked { "- [x] " } else { "- [ ] " };
            list_item(marker, &text, &node.children)
        }
        "quote" => quote(&with_children(text, &node.children)),
        "callout" => {
            let icon = content
                .and_then(|c| c.get("icon"))
                .and_then(|i| i.get("emoji"))
                .and_then(Value::as_str);
            let body = match icon {
                Some(emoji) => format!("{} {}", emoji, text),
                None => text,
            };
            quote(&with_children(body, &node.children))
        }
        "toggle" => with_children(text, &node.children),
        "code" => {
            let language = content
                .and_then(|c| c.get("language"))
                .and_then(Value::as_str)
                .filter(|lang| *lang != "plain text")
                .unwrap_or("");
            let code: String = content
                .and_then(|c| c.get("rich_text"))
                .and_then(Value::as_array)
                .map(|runs| runs.iter().filter_map(plain_text).collect())
                .unwrap_or_default();
            format!("```{}\n{}\n```", language, code)
        }
        "equation" => {
            let expression = content
                .and_then(|c| c.get("expression"))
                .and_then(Value::as_str)
                .unwrap_or("");
            format!("$$\n{}\n$$", expression)
        }
        "divider" => "---".to_string(),
        "image" => {
            let url = content.and_then(file_url)?;
            let caption = content.map(caption_field).unwrap_or_default();
            format!("![{}]({})", caption, url)
        }
        "bookmark" | "embed" | "link_preview" => {
            let url = content.and_then(|c| c.get("url")).and_then(Value::as_str)?;
            let caption = content.map(caption_field).unwrap_or_default();
            let label = if caption.is_empty() { url.to_string() } else { caption };
            format!("[{}]({})", label, url)
        }
        "child_page" | "child_database" => {
            let title = content
                .and_then(|c| c.get("title"))
                .and_then(Value::as_str)
                .unwrap_or("");
            format!("**{}**", title)
        }
        // 入れ物だけのブロックは子要素をそのまま並べる
        "column_list" | "column" | "synced_block" => {
            let nested = render_markdown(&node.children);
            if nested.is_empty() {
                return None;
            }
            nested
        }
        "table" => table(&node.children)?,
        other => {
            debug!(block_id = %block.id, block_type = other, "未対応のブロックをスキップ");
            return None;
        }
    };

    Some(rendered)
}

// 段落やトグルの子要素は本文の後ろに空行区切りで続ける
fn with_children(text: String, children: &[BlockNode]) -> String {
    if children.is_empty() {
        return text;
    }
    let nested = render_markdown(children);
    if text.is_empty() {
        nested
    } else {
        format!("{}\n\n{}", text, nested)
    }
}

// リストの子要素は2スペースでインデントする
fn list_item(marker: &str, text: &str, children: &[BlockNode]) -> String {
    let mut lines = vec![format!("{}{}", marker, text)];
    for child in children.iter().filter_map(render_node) {
        for line in child.lines() {
            if line.is_empty() {
                lines.push(String::new());
            } else {
                lines.push(format!("  {}", line));
            }
        }
    }
    lines.join("\n")
}

// 先頭行を見出し行として扱う（has_column_headerがfalseでもmarkdownの表には見出し行が必要）
fn table(rows: &[BlockNode]) -> Option<String> {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .filter(|row| row.block.block_type == "table_row")
        .map(|row| table_cells(&row.block))
        .collect();
    let width = rows.iter().map(Vec::len).max().filter(|w| *w > 0)?;

    let line = |cells: &[String]| {
        let padded: Vec<&str> = (0..width)
            .map(|i| cells.get(i).map_or("", String::as_str))
            .collect();
        format!("| {} |", padded.join(" | "))
    };

    let mut lines = vec![line(&rows[0]), format!("|{}", " --- |".repeat(width))];
    lines.extend(rows[1..].iter().map(|cells| line(cells)));
    Some(lines.join("\n"))
}

fn table_cells(row: &NotionBlock) -> Vec<String> {
    row.content()
        .and_then(|c| c.get("cells"))
        .and_then(Value::as_array)
        .map(|cells| {
            cells
                .iter()
                .map(|cell| {
                    cell.as_array()
                        .map(|runs| render_rich_text(runs).replace('|', "\\|"))
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default()
}

fn quote(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {}", line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn rich_text_field(content: &Value) -> String {
    content
        .get("rich_text")
        .and_then(Value::as_array)
        .map(|runs| render_rich_text(runs))
        .unwrap_or_default()
}

fn caption_field(content: &Value) -> String {
    content
        .get("caption")
        .and_then(Value::as_array)
        .map(|runs| render_rich_text(runs))
        .unwrap_or_default()
}

fn plain_text(run: &Value) -> Option<&str> {
    run.get("plain_text").and_then(Value::as_str)
}

fn file_url(content: &Value) -> Option<&str> {
    content
        .get("file")
        .or_else(|| content.get("external"))
        .and_then(|f| f.get("url"))
        .and_then(Value::as_str)
}

/// リッチテキストの配列を装飾付きのmarkdownに変換する
pub fn render_rich_text(runs: &[Value]) -> String {
    runs.iter().map(render_run).collect()
}

fn render_run(run: &Value) -> String {
    if run.get("type").and_then(Value::as_str) == Some("equation") {
        let expression = run
            .get("equation")
            .and_then(|e| e.get("expression"))
            .and_then(Value::as_str)
            .unwrap_or("");
        return format!("${}$", expression);
    }

    let mut text = plain_text(run).unwrap_or("").to_string();
    if text.trim().is_empty() {
        return text;
    }

    let flag = |name: &str| {
        run.get("annotations")
            .and_then(|a| a.get(name))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    };

    if flag("code") {
        text = format!("`{}`", text);
    }
    if flag("bold") {
        text = format!("**{}**", text);
    }
    if flag("italic") {
        text = format!("_{}_", text);
    }
    if flag("strikethrough") {
        text = format!("~~{}~~", text);
    }
    if let Some(href) = run.get("href").and_then(Value::as_str) {
        text = format!("[{}]({})", text, href);
    }

    text
}
