//! Target URL composition.

/// Join URL segments with exactly one `/` between them.
///
/// Leading and trailing slashes on each segment are ignored (the leading part
/// of the first segment is kept, so `https://` survives) and empty segments
/// are skipped. If the last non-empty segment carries a query string, that
/// query is appended verbatim after the joined path.
pub fn concat_path(segments: &[&str]) -> String {
    let last = segments.iter().rposition(|s| !s.is_empty());

    let mut query = None;
    let mut out = String::new();

    for (i, segment) in segments.iter().enumerate() {
        let mut segment = *segment;
        if Some(i) == last {
            if let Some((path, q)) = segment.split_once('?') {
                segment = path;
                query = Some(q);
            }
        }

        let piece = if out.is_empty() {
            segment.trim_end_matches('/')
        } else {
            segment.trim_matches('/')
        };
        if piece.is_empty() {
            continue;
        }

        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(piece);
    }

    if let Some(query) = query {
        out.push('?');
        out.push_str(query);
    }
    out
}
