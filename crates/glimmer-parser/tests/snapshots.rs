//! Snapshot tests of parsed template structure.

use glimmer_parser::{parse, Block, Statement};

fn outline(statements: &[Statement], depth: usize, out: &mut String) {
    for statement in statements {
        let indent = "  ".repeat(depth);
        match statement {
            Statement::Text(text) => {
                out.push_str(&format!("{indent}Text {} {:?}\n", text.span, text.chars));
            }
            Statement::Comment(comment) => {
                out.push_str(&format!("{indent}Comment {} {:?}\n", comment.span, comment.value));
            }
            Statement::MustacheComment(comment) => {
                out.push_str(&format!(
                    "{indent}MustacheComment {} {:?}\n",
                    comment.span, comment.value
                ));
            }
            Statement::Mustache(mustache) => {
                out.push_str(&format!("{indent}Mustache {}\n", mustache.span));
            }
            Statement::Block(block) => {
                out.push_str(&format!("{indent}Block {}\n", block.span));
                outline_arm("program", &block.program, depth + 1, out);
                if let Some(inverse) = &block.inverse {
                    outline_arm("inverse", inverse, depth + 1, out);
                }
            }
            Statement::Element(element) => {
                out.push_str(&format!("{indent}Element <{}> {}\n", element.tag, element.span));
                outline(&element.children, depth + 1, out);
            }
        }
    }
}

fn outline_arm(label: &str, arm: &Block, depth: usize, out: &mut String) {
    let params: Vec<&str> = arm.block_params.iter().map(|param| param.name.as_str()).collect();
    out.push_str(&format!(
        "{}{label} {} [{}]\n",
        "  ".repeat(depth),
        arm.span,
        params.join(", ")
    ));
    outline(&arm.body, depth + 1, out);
}

fn parse_outline(source: &str) -> String {
    let template = parse(source).unwrap();
    let mut out = String::new();
    outline(&template.body, 0, &mut out);
    out
}

#[test]
fn test_snapshot_block_inside_element() {
    let output = parse_outline(
        "<ul>{{#each @items as |item|}}<li class=\"x\">{{item}}</li>{{else}}-{{/each}}</ul>\n{{! note }}",
    );
    insta::assert_snapshot!(output, @r###"
    Element <ul> 0:80
      Block 4:75
        program 30:57 [item]
          Element <li> 30:57
            Mustache 44:52
        inverse 65:66 []
          Text 65:66 "-"
    Text 80:81 "\n"
    MustacheComment 81:92 " note "
    "###);
}
