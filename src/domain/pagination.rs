/// 総件数とページあたりの件数からページ数を計算する
///
/// `floor(total / page_size) + (余りがあれば1)`。記事が無ければ0、page_sizeが0の場合も0を返す。
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total / page_size + usize::from(total % page_size > 0)
}

/// 1始まりのページ番号に対応する範囲を切り出す
///
/// `[(page-1)*page_size, page*page_size)`。範囲外のページ（0を含む）は空を返す。
pub fn page_slice<T: Clone>(items: &[T], page: usize, page_size: usize) -> Vec<T> {
    if page == 0 || page_size == 0 {
        return Vec::new();
    }
    let start = (page - 1).saturating_mul(page_size);
    if start >= items.len() {
        return Vec::new();
    }
    let end = start.saturating_add(page_size).min(items.len());
    items[start..end].to_vec()
}
