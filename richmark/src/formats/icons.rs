//! Icon mapping for the tree visualization format

/// Get the Unicode icon for a node type
///
/// Returns a single character that visually represents the node type, so a
/// tree dump can be scanned without reading every label.
pub fn get_icon(node_type: &str) -> &'static str {
    match node_type {
        "doc" => "⧉",
        "paragraph" => "¶",
        "heading" => "§",
        "blockquote" => "❝",
        "spoiler" => "▒",
        "code_block" | "stack_snippet_lang" => "𝒱",
        "stack_snippet" => "⧈",
        "bullet_list" | "ordered_list" => "☰",
        "list_item" => "•",
        "horizontal_rule" => "⎯",
        "html_block" | "html_inline" | "html_block_container" | "pre" => "‹›",
        "table" | "table_head" | "table_body" | "table_row" => "▦",
        "table_cell" | "table_header" => "▢",
        "image" => "▣",
        "hard_break" | "softbreak" => "↵",
        "tagLink" => "#",
        "text" => "◦",
        _ => "○",
    }
}
