
use erbfmt::{
    Doc, Engine, ErbfmtError, FormatError, FormatOptions, Formatting, Keyword, MarkupFormatter,
    Node, ParseErrorKind, ScriptFormatter,
};
use fixtures::{generate_random_whitespace, generate_random_whitespace_at_least_one, get_engine};

#[test]
#[ntest::timeout(100)]
fn test_round_trip_on_inert_input() {
    let engine = get_engine();
    let input = "<main>\n  <p>no tags here</p>\n</main>\n";

    let rendered = engine.format_to_string(input).unwrap();
    assert_eq!(
        rendered, input,
        "tag-free input must reproduce byte for byte"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_expression_scenario() {
    let engine = get_engine();
    let root = engine
        .parse("<div class=\"<%= cls %>\">\n<%= val %>\n</div>")
        .unwrap();

    let first = root.resolve_node("#~1~#").expect("first expression");
    let second = root.resolve_node("#~2~#").expect("second expression");
    assert_eq!(first.content(), "cls");
    assert_eq!(second.content(), "val");
    assert!(matches!(first, Node::Expression(_)));
    assert_eq!(root.content(), "<div class=\"#~1~#\">\n#~2~#\n</div>");
}

#[test]
#[ntest::timeout(100)]
fn test_if_else_block_scenario() {
    let engine = get_engine();
    let root = engine.parse("<% if @test %>A<% else %>B<% end %>").unwrap();

    let blocks: Vec<_> = root
        .nodes()
        .filter_map(|node| match node {
            Node::Block(block) => Some(block),
            _ => None,
        })
        .collect();
    assert_eq!(blocks.len(), 1, "expected exactly one block");

    let block = blocks[0];
    let start = root.resolve_node(&block.start).expect("block start");
    let end = root.resolve_node(&block.end).expect("block end");
    assert_eq!(start.keyword(), Some(Keyword::If));
    assert_eq!(end.keyword(), Some(Keyword::End));

    let separators: Vec<_> = root
        .nodes()
        .filter(|node| node.keyword().is_some_and(|keyword| keyword.is_branch()))
        .collect();
    assert_eq!(separators.len(), 1);
    assert_eq!(separators[0].keyword(), Some(Keyword::Else));
    assert!(
        block.content.contains(separators[0].id()),
        "the else separator must live inside the block content"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_comment_never_pushes_the_stack() {
    let engine = get_engine();
    // If the comment participated in matching, the `end` would pair with
    // it instead of the `if` and the block would be corrupted.
    let root = engine
        .parse("<% if a %><%# if b %>x<% end %>")
        .unwrap();

    let block = root
        .nodes()
        .find_map(|node| match node {
            Node::Block(block) => Some(block),
            _ => None,
        })
        .expect("expected one block");
    let start = root.resolve_node(&block.start).expect("block start");
    assert_eq!(start.keyword(), Some(Keyword::If));
    assert_eq!(start.content(), "if a");
}

#[test]
#[ntest::timeout(100)]
fn test_keyword_only_statement_boundary() {
    let engine = get_engine();
    let root = engine.parse("<div><%if%>x<% end %></div>").unwrap();

    let statement = root
        .nodes()
        .find(|node| node.keyword() == Some(Keyword::If))
        .expect("the bare if statement");
    assert_eq!(statement.content(), "if");
}

#[test]
#[ntest::timeout(100)]
fn test_mismatch_folding() {
    let engine = get_engine();
    // `case` closes before `if` can; the builder must not cross-match.
    let root = engine
        .parse("<% if a %><% case b %><% when 1 %>x<% end %>")
        .unwrap();

    let block = root
        .nodes()
        .find_map(|node| match node {
            Node::Block(block) => Some(block),
            _ => None,
        })
        .expect("expected one block");
    let start = root.resolve_node(&block.start).expect("block start");
    assert_eq!(
        start.keyword(),
        Some(Keyword::Case),
        "the end must pair with case, not if"
    );

    let dangling = root
        .nodes()
        .find(|node| node.keyword() == Some(Keyword::If))
        .expect("the dangling if");
    assert!(
        root.content().contains(dangling.id()),
        "the dangling if must be folded to a plain placeholder"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_unmatched_closer_reports_code_and_position() {
    let engine = get_engine();
    let result = engine.parse("line one\n<% end %>");

    match result {
        Err(ErbfmtError::Parse(err)) => {
            assert_eq!(err.offset, 9);
            assert_eq!(err.line, 2);
            assert_eq!(err.column, 1);
            match err.kind {
                ParseErrorKind::UnmatchedClosing { code } => assert_eq!(code, "end"),
                other => panic!("expected UnmatchedClosing, got {:?}", other),
            }
        }
        other => panic!("an unmatched end must be a fatal parse error, got {:?}", other),
    }
}

#[test]
#[ntest::timeout(100)]
fn test_placeholder_ids_never_occur_in_input() {
    let engine = get_engine();
    let input = "literal #~1~# and #~2~# with <%= x %> and <% if a %>y<% end %>";
    let root = engine.parse(input).unwrap();

    assert!(root.node_count() > 0);
    for node in root.nodes() {
        assert!(
            !input.contains(node.id()),
            "generated id {} collides with input",
            node.id()
        );
    }
}

#[test]
#[ntest::timeout(100)]
fn test_balanced_input_resolves_every_end() {
    let engine = get_engine();
    let root = engine
        .parse("<% if a %>1<% elsif b %>2<% else %>3<% end %><% unless c %>4<% end %>")
        .unwrap();

    let end_count = root
        .nodes()
        .filter(|node| node.keyword() == Some(Keyword::End))
        .count();
    let block_count = root
        .nodes()
        .filter(|node| matches!(node, Node::Block(_)))
        .count();
    assert_eq!(end_count, 2);
    assert_eq!(block_count, 2, "every end must terminate exactly one block");
}

#[test]
#[ntest::timeout(100)]
fn test_statement_with_random_whitespace() {
    let template = format!(
        "<%{}if{}cond{}%>x<%{}end{}%>",
        generate_random_whitespace(),
        generate_random_whitespace_at_least_one(),
        generate_random_whitespace(),
        generate_random_whitespace_at_least_one(),
        generate_random_whitespace(),
    );

    let engine = get_engine();
    let root = engine.parse(&template).unwrap();
    let block = root
        .nodes()
        .find_map(|node| match node {
            Node::Block(block) => Some(block),
            _ => None,
        })
        .expect("whitespace must not affect block matching");
    let start = root.resolve_node(&block.start).expect("block start");
    assert_eq!(start.content(), "if cond");
}

#[test]
#[ntest::timeout(100)]
fn test_multiline_template_formatting() {
    let engine = get_engine();
    let input = "<section>\n<% if user %>\n<p><%= user %></p>\n<% else %>\n<p>guest</p>\n<% end %>\n</section>";
    let expected = "<section>\n<% if user %>\n  <p><%= user %></p>\n<% else %>\n  <p>guest</p>\n<% end %>\n</section>";

    assert_eq!(engine.format_to_string(input).unwrap(), expected);
}

/// A script formatter that normalizes `==` spacing, standing in for a real
/// language engine to prove delegation happens per tag body.
struct SpacingScript;

impl ScriptFormatter for SpacingScript {
    fn format(&self, code: &str, _options: &FormatOptions) -> Result<String, FormatError> {
        Ok(code
            .split('\n')
            .map(|line| {
                line.split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[test]
#[ntest::timeout(100)]
fn test_script_formatter_receives_tag_bodies() {
    let engine = Engine::with_formatters(erbfmt::PassthroughMarkup, SpacingScript);
    let rendered = engine
        .format_to_string("<%= a   +   b %><% x   =   1 %>")
        .unwrap();
    assert_eq!(rendered, "<%= a + b %><% x = 1 %>");
}

/// A markup formatter that fails on demand, to observe abort semantics.
struct FailingMarkup;

impl MarkupFormatter for FailingMarkup {
    fn format(&self, _text: &str, _options: &FormatOptions) -> Result<Doc, FormatError> {
        Err(FormatError::new("markup engine unavailable"))
    }
}

#[test]
#[ntest::timeout(100)]
fn test_markup_failure_produces_no_partial_output() {
    let engine = Engine::with_formatters(FailingMarkup, erbfmt::PassthroughScript);
    let result = engine.format_to_string("text <%= x %>");

    match result {
        Err(ErbfmtError::Format(err)) => {
            assert_eq!(err.message, "markup engine unavailable");
        }
        other => panic!("expected a format error, got {:?}", other),
    }
}

#[test]
#[ntest::timeout(100)]
fn test_unterminated_opener_formats_as_plain_tag() {
    let engine = get_engine();
    // No matching end anywhere: the opener is folded, not fatal.
    let rendered = engine.format_to_string("<% if a %>body").unwrap();
    assert_eq!(rendered, "<% if a %>body");
}

#[test]
#[ntest::timeout(100)]
fn test_source_spans_locate_nodes() {
    let engine = get_engine();
    let input = "ab<%= x %>cd<% if y %>e<% end %>";
    let root = engine.parse(input).unwrap();

    let expr = root.node_at(4).expect("offset inside the expression");
    assert_eq!(expr.content(), "x");
    let span = expr.span();
    assert_eq!(&input[span.offset..span.offset + span.length], "<%= x %>");

    let opener = root.node_at(14).expect("offset inside the if tag");
    assert_eq!(opener.keyword(), Some(Keyword::If));
}
