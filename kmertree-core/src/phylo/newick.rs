use super::tree::{pairwise_distances, Tree};
use crate::error::{PhyloError, PhyloResult};

/// Serialize a finished tree, base subtrees outermost.
///
/// # Panics
///
/// Panics if the tree has no base yet.
pub fn to_newick(tree: &Tree) -> String {
    assert!(tree.is_complete(), "newick output needs a finished tree");
    let mut s = String::new();
    s.push('(');
    for (i, child) in tree.base().iter().enumerate() {
        if i > 0 {
            s.push(',');
        }
        write_subtree(tree, child.node, &mut s);
        write_length(&mut s, child.distance);
    }
    s.push_str(");");
    s
}

fn needs_quoting(label: &str) -> bool {
    label.chars().any(|ch| {
        ch.is_whitespace() || matches!(ch, ':' | ',' | '(' | ')' | ';' | '[' | ']' | '\'')
    })
}

fn write_label(out: &mut String, label: &str) {
    if label.is_empty() {
        return;
    }
    if needs_quoting(label) {
        out.push('\'');
        for ch in label.chars() {
            if ch == '\'' {
                out.push_str("''");
            } else {
                out.push(ch);
            }
        }
        out.push('\'');
    } else {
        out.push_str(label);
    }
}

fn write_length(out: &mut String, len: f64) {
    out.push(':');
    out.push_str(&format!("{:.6}", len));
}

pub(crate) fn write_subtree(tree: &Tree, idx: usize, out: &mut String) {
    let node = tree.node(idx);
    match node.children {
        None => {
            if let Some(ref label) = node.name {
                write_label(out, label);
            }
        }
        Some([a, b]) => {
            out.push('(');
            write_subtree(tree, a.node, out);
            write_length(out, a.distance);
            out.push(',');
            write_subtree(tree, b.node, out);
            write_length(out, b.distance);
            out.push(')');
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedNode {
    pub label: Option<String>,
    pub length: Option<f64>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// A Newick tree read back from text. Node 0 is the outermost node.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTree {
    nodes: Vec<ParsedNode>,
}

impl ParsedTree {
    pub fn nodes(&self) -> &[ParsedNode] {
        &self.nodes
    }

    pub fn root(&self) -> &ParsedNode {
        &self.nodes[0]
    }

    pub fn leaves(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&i| self.nodes[i].children.is_empty())
            .collect()
    }

    pub fn leaf_names(&self) -> Vec<String> {
        self.leaves()
            .into_iter()
            .map(|i| self.nodes[i].label.clone().unwrap_or_default())
            .collect()
    }

    /// Path lengths between leaves, in `leaf_names()` order. Missing lengths count as zero.
    pub fn patristic_matrix(&self) -> Vec<Vec<f64>> {
        let parents: Vec<Option<usize>> = self.nodes.iter().map(|n| n.parent).collect();
        // Children are always pushed after their parent.
        let mut depths = vec![0.0f64; self.nodes.len()];
        for idx in 1..self.nodes.len() {
            let parent = parents[idx].unwrap_or(0);
            depths[idx] = depths[parent] + self.nodes[idx].length.unwrap_or(0.0);
        }
        pairwise_distances(&parents, &depths, &self.leaves())
    }
}

struct Parser<'a> {
    text: &'a [u8],
    pos: usize,
    nodes: Vec<ParsedNode>,
}

impl<'a> Parser<'a> {
    fn err(&self, msg: &'static str) -> PhyloError {
        PhyloError::NewickFormat { msg, pos: self.pos }
    }

    fn skip_ws(&mut self) {
        while self.pos < self.text.len() && self.text[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_ws();
        self.text.get(self.pos).copied()
    }

    fn node(&mut self, parent: Option<usize>) -> PhyloResult<usize> {
        let idx = self.nodes.len();
        self.nodes.push(ParsedNode {
            label: None,
            length: None,
            parent,
            children: Vec::new(),
        });
        if let Some(p) = parent {
            self.nodes[p].children.push(idx);
        }

        if self.peek() == Some(b'(') {
            self.pos += 1;
            loop {
                self.node(Some(idx))?;
                match self.peek() {
                    Some(b',') => self.pos += 1,
                    Some(b')') => {
                        self.pos += 1;
                        break;
                    }
                    _ => return Err(self.err("expected ',' or ')'")),
                }
            }
        }

        self.nodes[idx].label = self.label()?;
        if self.peek() == Some(b':') {
            self.pos += 1;
            self.nodes[idx].length = Some(self.number()?);
        }
        Ok(idx)
    }

    fn label(&mut self) -> PhyloResult<Option<String>> {
        match self.peek() {
            Some(b'\'') => {
                self.pos += 1;
                let mut out = Vec::new();
                loop {
                    match self.text.get(self.pos) {
                        Some(b'\'') if self.text.get(self.pos + 1) == Some(&b'\'') => {
                            out.push(b'\'');
                            self.pos += 2;
                        }
                        Some(b'\'') => {
                            self.pos += 1;
                            break;
                        }
                        Some(&b) => {
                            out.push(b);
                            self.pos += 1;
                        }
                        None => return Err(self.err("unterminated quoted label")),
                    }
                }
                Ok(Some(String::from_utf8_lossy(&out).into_owned()))
            }
            _ => {
                let start = self.pos;
                while let Some(&b) = self.text.get(self.pos) {
                    if b.is_ascii_whitespace() || b"(),:;[]'".contains(&b) {
                        break;
                    }
                    self.pos += 1;
                }
                if self.pos == start {
                    Ok(None)
                } else {
                    Ok(Some(
                        String::from_utf8_lossy(&self.text[start..self.pos]).into_owned(),
                    ))
                }
            }
        }
    }

    fn number(&mut self) -> PhyloResult<f64> {
        self.skip_ws();
        let start = self.pos;
        while let Some(&b) = self.text.get(self.pos) {
            if b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E') {
                self.pos += 1;
            } else {
                break;
            }
        }
        std::str::from_utf8(&self.text[start..self.pos])
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| self.err("expected a branch length"))
    }
}

pub fn parse_newick(text: &str) -> PhyloResult<ParsedTree> {
    let mut parser = Parser {
        text: text.as_bytes(),
        pos: 0,
        nodes: Vec::new(),
    };
    if parser.peek().is_none() {
        return Err(parser.err("empty newick string"));
    }
    parser.node(None)?;
    if parser.peek() != Some(b';') {
        return Err(parser.err("expected ';'"));
    }
    parser.pos += 1;
    if parser.peek().is_some() {
        return Err(parser.err("trailing characters after ';'"));
    }
    Ok(ParsedTree {
        nodes: parser.nodes,
    })
}
