//! In-memory DOM used by [`MockDriver`](super::MockDriver).
//!
//! Supports the selector subset the binding layer and its tests need:
//! CSS compounds (`tag`, `*`, `#id`, `.class`, `[attr]`, `[attr="v"]`,
//! `:nth-child(n)`) joined by descendant or `>` combinators, comma lists,
//! and XPath location paths (`/`, `//`, `..`, `[n]`, `[@attr='v']`).

use crate::locator::{ElementPath, Locator, Selector, Step};
use crate::result::{UiError, UiResult};

/// Tags whose rendered text starts on a new line
const BLOCK_TAGS: &[&str] = &[
    "div", "p", "li", "ul", "ol", "tr", "table", "thead", "tbody", "tfoot", "h1", "h2", "h3",
    "h4", "h5", "h6", "section", "form", "option", "select", "header", "footer", "nav",
];

/// Builder for one mock element and its subtree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockNode {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<MockNode>,
    hidden: bool,
    value: String,
    checked: bool,
    style: Vec<(String, String)>,
}

impl MockNode {
    /// Create an element with `tag`
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            ..Self::default()
        }
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.retain(|(n, _)| n != name);
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }

    /// Set the `id` attribute
    #[must_use]
    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    /// Set the `class` attribute
    #[must_use]
    pub fn class(self, class: &str) -> Self {
        self.attr("class", class)
    }

    /// Mark as disabled
    #[must_use]
    pub fn disabled(self) -> Self {
        self.attr("disabled", "")
    }

    /// Own text content
    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    /// Append a child element
    #[must_use]
    pub fn child(mut self, child: MockNode) -> Self {
        self.children.push(child);
        self
    }

    /// Append several child elements
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = MockNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Render with `display: none`
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Initial input value
    #[must_use]
    pub fn value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    /// Start checked
    #[must_use]
    pub fn checked(mut self) -> Self {
        self.checked = true;
        self
    }

    /// Computed style property
    #[must_use]
    pub fn style(mut self, property: &str, value: &str) -> Self {
        self.style.push((property.to_string(), value.to_string()));
        self
    }

    /// `<tr>` with one `<td>` per cell
    #[must_use]
    pub fn row(cells: &[&str]) -> Self {
        Self::new("tr").children(cells.iter().map(|c| Self::new("td").text(c)))
    }

    /// `<tr>` with one `<th>` per name
    #[must_use]
    pub fn header_row(names: &[&str]) -> Self {
        Self::new("tr").children(names.iter().map(|c| Self::new("th").text(c)))
    }
}

/// A page the mock can show: title plus body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockPage {
    /// Document title
    pub title: String,
    /// Body element
    pub body: MockNode,
}

impl MockPage {
    /// Page with `body` and no title
    #[must_use]
    pub fn new(body: MockNode) -> Self {
        Self {
            title: String::new(),
            body,
        }
    }

    /// Set the title
    #[must_use]
    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }
}

// =============================================================================
// ARENA
// =============================================================================

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<usize>,
    pub parent: Option<usize>,
    pub hidden: bool,
    pub value: String,
    pub checked: bool,
    pub style: Vec<(String, String)>,
    pub files: Vec<String>,
}

impl Node {
    fn element(tag: &str, parent: Option<usize>) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: Vec::new(),
            text: String::new(),
            children: Vec::new(),
            parent,
            hidden: false,
            value: String::new(),
            checked: false,
            style: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|x| x == class))
    }
}

/// Arena of nodes in document order; index 0 is the document, 1 is `<html>`
#[derive(Debug, Clone)]
pub(crate) struct Document {
    pub nodes: Vec<Node>,
}

impl Document {
    pub fn build(body: &MockNode) -> Self {
        let mut doc = Self {
            nodes: vec![Node::element("#document", None), Node::element("html", Some(0))],
        };
        doc.nodes[0].children.push(1);
        if body.tag == "body" {
            doc.insert(body, 1);
        } else {
            let wrapper = MockNode::new("body").child(body.clone());
            doc.insert(&wrapper, 1);
        }
        doc
    }

    fn insert(&mut self, node: &MockNode, parent: usize) -> usize {
        let id = self.nodes.len();
        let mut data = Node::element(&node.tag, Some(parent));
        data.attrs.clone_from(&node.attrs);
        data.text.clone_from(&node.text);
        data.hidden = node.hidden;
        data.value.clone_from(&node.value);
        data.checked = node.checked;
        data.style.clone_from(&node.style);
        self.nodes.push(data);
        self.nodes[parent].children.push(id);
        for child in &node.children {
            self.insert(child, id);
        }
        id
    }

    /// All descendants of `id` in document order
    pub fn descendants(&self, id: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[id].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next].children.iter().rev());
        }
        out
    }

    fn element_siblings(&self, id: usize) -> &[usize] {
        match self.nodes[id].parent {
            Some(p) => &self.nodes[p].children,
            None => &[],
        }
    }

    pub fn body(&self) -> Option<usize> {
        self.nodes[1]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].tag == "body")
    }

    pub fn is_visible(&self, id: usize) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if self.nodes[current].hidden {
                return false;
            }
            cursor = self.nodes[current].parent;
        }
        true
    }

    /// Rendered text: cells of a row are tab-separated, block children start on a new line
    pub fn inner_text(&self, id: usize) -> String {
        let node = &self.nodes[id];
        if node.hidden {
            return String::new();
        }
        let mut parts = Vec::new();
        if !node.text.is_empty() {
            parts.push(node.text.clone());
        }
        let mut has_block = false;
        for &child in &node.children {
            has_block |= BLOCK_TAGS.contains(&self.nodes[child].tag.as_str());
            let text = self.inner_text(child);
            if !text.is_empty() {
                parts.push(text);
            }
        }
        let separator = if node.tag == "tr" {
            "\t"
        } else if has_block {
            "\n"
        } else {
            ""
        };
        parts.join(separator)
    }

    pub fn markup(&self, id: usize) -> String {
        let node = &self.nodes[id];
        let mut out = format!("<{}", node.tag);
        for (name, value) in &node.attrs {
            out.push_str(&format!(" {name}=\"{value}\""));
        }
        out.push('>');
        out.push_str(&node.text);
        for &child in &node.children {
            out.push_str(&self.markup(child));
        }
        out.push_str(&format!("</{}>", node.tag));
        out
    }

    pub fn element_path(&self, id: usize) -> ElementPath {
        let mut css = Vec::new();
        let mut xpath = Vec::new();
        let mut cursor = id;
        while cursor != 0 {
            let node = &self.nodes[cursor];
            if node.tag == "html" || node.tag == "body" {
                css.push(node.tag.clone());
                xpath.push(node.tag.clone());
            } else {
                let siblings = self.element_siblings(cursor);
                let nth_child = siblings.iter().position(|&s| s == cursor).unwrap_or(0) + 1;
                let nth_of_type = siblings
                    .iter()
                    .filter(|&&s| self.nodes[s].tag == node.tag)
                    .position(|&s| s == cursor)
                    .unwrap_or(0)
                    + 1;
                css.push(format!("{}:nth-child({nth_child})", node.tag));
                xpath.push(format!("{}[{nth_of_type}]", node.tag));
            }
            cursor = node.parent.unwrap_or(0);
        }
        css.reverse();
        xpath.reverse();
        ElementPath {
            css: css.join(" > "),
            xpath: format!("/{}", xpath.join("/")),
        }
    }

    // =========================================================================
    // LOCATOR RESOLUTION
    // =========================================================================

    pub fn resolve(&self, locator: &Locator) -> UiResult<Vec<usize>> {
        let mut current = self.query_all(locator.root(), 0)?;
        for step in locator.steps() {
            current = self.apply(step, &current)?;
        }
        Ok(current)
    }

    fn apply(&self, step: &Step, current: &[usize]) -> UiResult<Vec<usize>> {
        let next = match step {
            Step::Locate { selector } => {
                let mut found = Vec::new();
                for &scope in current {
                    found.extend(self.query_all(selector, scope)?);
                }
                found
            }
            Step::FilterText { text, exact } => current
                .iter()
                .copied()
                .filter(|&id| text_matches(&self.inner_text(id), text, *exact))
                .collect(),
            Step::FilterHas { selector } => {
                let mut kept = Vec::new();
                for &id in current {
                    if !self.query_all(selector, id)?.is_empty() {
                        kept.push(id);
                    }
                }
                kept
            }
            Step::FilterHasText { text, exact } => current
                .iter()
                .copied()
                .filter(|&id| {
                    self.descendants(id)
                        .into_iter()
                        .any(|d| text_matches(&self.nodes[d].text, text, *exact))
                })
                .collect(),
            Step::GetByText { text, exact } => current
                .iter()
                .flat_map(|&id| self.descendants(id))
                .filter(|&d| text_matches(&self.nodes[d].text, text, *exact))
                .collect(),
            Step::Nth { index } => current.get(*index).copied().into_iter().collect(),
            Step::Last => current.last().copied().into_iter().collect(),
            Step::Parent => current
                .iter()
                .filter_map(|&id| self.nodes[id].parent)
                .filter(|&p| p != 0)
                .collect(),
            Step::NextSibling { tag } => current
                .iter()
                .filter_map(|&id| {
                    let siblings = self.element_siblings(id);
                    let pos = siblings.iter().position(|&s| s == id)?;
                    siblings.get(pos + 1).copied()
                })
                .filter(|&s| tag == "*" || self.nodes[s].tag.eq_ignore_ascii_case(tag))
                .collect(),
        };
        Ok(dedup_in_order(next))
    }

    /// Matches of `selector` strictly inside `scope`
    fn query_all(&self, selector: &Selector, scope: usize) -> UiResult<Vec<usize>> {
        match selector {
            Selector::Css(css) => {
                let list = parse_css(css)?;
                Ok(self
                    .descendants(scope)
                    .into_iter()
                    .filter(|&id| id != 0 && list.iter().any(|c| self.matches_complex(id, c, c.len() - 1)))
                    .collect())
            }
            Selector::XPath(expr) => {
                // Inside a scope, `//x` and `/x` are evaluated relative to it
                let steps = parse_xpath(expr)?;
                Ok(self.eval_xpath(&steps, scope))
            }
        }
    }

    fn matches_complex(&self, id: usize, parts: &[(Combinator, Compound)], idx: usize) -> bool {
        let (combinator, compound) = &parts[idx];
        if !self.matches_compound(id, compound) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => self.nodes[id]
                .parent
                .is_some_and(|p| p != 0 && self.matches_complex(p, parts, idx - 1)),
            Combinator::Descendant => {
                let mut cursor = self.nodes[id].parent;
                while let Some(p) = cursor {
                    if p == 0 {
                        break;
                    }
                    if self.matches_complex(p, parts, idx - 1) {
                        return true;
                    }
                    cursor = self.nodes[p].parent;
                }
                false
            }
        }
    }

    fn matches_compound(&self, id: usize, compound: &Compound) -> bool {
        let node = &self.nodes[id];
        if let Some(tag) = &compound.tag {
            if tag != "*" && !node.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(want) = &compound.id {
            if node.attr("id") != Some(want.as_str()) {
                return false;
            }
        }
        if !compound.classes.iter().all(|c| node.has_class(c)) {
            return false;
        }
        for (name, value) in &compound.attrs {
            match (node.attr(name), value) {
                (None, _) => return false,
                (Some(actual), Some(want)) if actual != want => return false,
                _ => {}
            }
        }
        if let Some(n) = compound.nth_child {
            let siblings = self.element_siblings(id);
            if siblings.iter().position(|&s| s == id).map(|p| p + 1) != Some(n) {
                return false;
            }
        }
        true
    }

    fn eval_xpath(&self, steps: &[XStep], start: usize) -> Vec<usize> {
        let mut context = vec![start];
        for step in steps {
            let mut next = Vec::new();
            for &ctx in &context {
                if step.parent {
                    if let Some(p) = self.nodes[ctx].parent {
                        next.push(p);
                    }
                    continue;
                }
                let mut scopes = vec![ctx];
                if step.descendant {
                    scopes.extend(self.descendants(ctx));
                }
                for scope in scopes {
                    let matching: Vec<usize> = self.nodes[scope]
                        .children
                        .iter()
                        .copied()
                        .filter(|&c| step.tag == "*" || self.nodes[c].tag == step.tag)
                        .filter(|&c| match &step.attr {
                            Some((name, want)) => self.nodes[c].attr(name) == Some(want.as_str()),
                            None => true,
                        })
                        .collect();
                    match step.position {
                        Some(pos) => next.extend(matching.get(pos.saturating_sub(1)).copied()),
                        None => next.extend(matching),
                    }
                }
            }
            context = dedup_in_order(next);
        }
        context.retain(|&id| id != 0);
        context
    }
}

fn dedup_in_order(mut ids: Vec<usize>) -> Vec<usize> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Containment is case-insensitive over collapsed whitespace; exact is trimmed equality
pub(crate) fn text_matches(haystack: &str, needle: &str, exact: bool) -> bool {
    if exact {
        haystack.trim() == needle.trim()
    } else {
        let hay = haystack.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        let want = needle.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        hay.contains(&want)
    }
}

// =============================================================================
// CSS PARSER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
    nth_child: Option<usize>,
}

type Complex = Vec<(Combinator, Compound)>;

fn unsupported(what: &str, selector: &str) -> UiError {
    UiError::driver(format!("mock selector engine does not support {what} in {selector:?}"))
}

fn split_top_level(selector: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in selector.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '[' | '(') => depth += 1,
            (None, ']' | ')') => depth -= 1,
            (None, ',') if depth == 0 => {
                parts.push(&selector[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&selector[start..]);
    parts
}

fn parse_css(selector: &str) -> UiResult<Vec<Complex>> {
    split_top_level(selector)
        .into_iter()
        .map(|part| parse_complex(part.trim(), selector))
        .collect()
}

fn parse_complex(text: &str, selector: &str) -> UiResult<Complex> {
    let chars: Vec<char> = text.chars().collect();
    let mut parts: Complex = Vec::new();
    let mut combinator = Combinator::Descendant;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            '>' => {
                combinator = Combinator::Child;
                i += 1;
            }
            '+' | '~' => return Err(unsupported("sibling combinators", selector)),
            _ => {
                let (compound, next) = parse_compound(&chars, i, selector)?;
                parts.push((combinator, compound));
                combinator = Combinator::Descendant;
                i = next;
            }
        }
    }
    if parts.is_empty() {
        return Err(UiError::invalid_argument(format!("empty selector {selector:?}")));
    }
    Ok(parts)
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn read_ident(chars: &[char], mut i: usize) -> (String, usize) {
    let start = i;
    while i < chars.len() && is_ident(chars[i]) {
        i += 1;
    }
    (chars[start..i].iter().collect(), i)
}

fn parse_compound(chars: &[char], mut i: usize, selector: &str) -> UiResult<(Compound, usize)> {
    let mut compound = Compound::default();
    if chars[i] == '*' {
        compound.tag = Some("*".into());
        i += 1;
    } else if is_ident(chars[i]) {
        let (tag, next) = read_ident(chars, i);
        compound.tag = Some(tag.to_lowercase());
        i = next;
    }
    while i < chars.len() {
        match chars[i] {
            '#' => {
                let (id, next) = read_ident(chars, i + 1);
                compound.id = Some(id);
                i = next;
            }
            '.' => {
                let (class, next) = read_ident(chars, i + 1);
                compound.classes.push(class);
                i = next;
            }
            '[' => {
                let close = chars[i..]
                    .iter()
                    .position(|&c| c == ']')
                    .ok_or_else(|| UiError::invalid_argument(format!("unclosed [ in {selector:?}")))?;
                let body: String = chars[i + 1..i + close].iter().collect();
                compound.attrs.push(match body.split_once('=') {
                    Some((name, value)) => (
                        name.trim().to_string(),
                        Some(value.trim().trim_matches(|c| c == '"' || c == '\'').to_string()),
                    ),
                    None => (body.trim().to_string(), None),
                });
                i += close + 1;
            }
            ':' => {
                let rest: String = chars[i..].iter().collect();
                let Some(arg) = rest.strip_prefix(":nth-child(") else {
                    return Err(unsupported("this pseudo-class", selector));
                };
                let close = arg
                    .find(')')
                    .ok_or_else(|| UiError::invalid_argument(format!("unclosed ( in {selector:?}")))?;
                let n = arg[..close]
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| unsupported("non-numeric :nth-child", selector))?;
                compound.nth_child = Some(n);
                i += ":nth-child(".len() + arg[..close].chars().count() + 1;
            }
            _ => break,
        }
    }
    Ok((compound, i))
}

// =============================================================================
// XPATH PARSER
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct XStep {
    descendant: bool,
    parent: bool,
    tag: String,
    position: Option<usize>,
    attr: Option<(String, String)>,
}

fn parse_xpath(expr: &str) -> UiResult<Vec<XStep>> {
    let mut steps = Vec::new();
    let mut rest = expr.trim();
    let mut descendant = false;
    while !rest.is_empty() {
        if let Some(r) = rest.strip_prefix("//") {
            descendant = true;
            rest = r;
            continue;
        }
        if let Some(r) = rest.strip_prefix('/') {
            rest = r;
            continue;
        }
        let end = rest.find('/').unwrap_or(rest.len());
        let token = &rest[..end];
        rest = &rest[end..];
        if token == ".." {
            steps.push(XStep {
                descendant: false,
                parent: true,
                tag: String::new(),
                position: None,
                attr: None,
            });
            continue;
        }
        if token == "." {
            continue;
        }
        let (tag, predicate) = match token.split_once('[') {
            Some((tag, pred)) => (tag, Some(pred.trim_end_matches(']'))),
            None => (token, None),
        };
        let mut step = XStep {
            descendant,
            parent: false,
            tag: tag.to_lowercase(),
            position: None,
            attr: None,
        };
        if let Some(pred) = predicate {
            if let Some(attr) = pred.strip_prefix('@') {
                let (name, value) = attr
                    .split_once('=')
                    .ok_or_else(|| unsupported("this predicate", expr))?;
                step.attr = Some((
                    name.trim().to_string(),
                    value.trim().trim_matches(|c| c == '"' || c == '\'').to_string(),
                ));
            } else {
                step.position = Some(
                    pred.trim()
                        .parse()
                        .map_err(|_| unsupported("this predicate", expr))?,
                );
            }
        }
        descendant = false;
        steps.push(step);
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_doc() -> Document {
        Document::build(
            &MockNode::new("body").child(
                MockNode::new("table").id("orders").children([
                    MockNode::header_row(&["ID", "Name", "Status"]),
                    MockNode::row(&["1", "Alice", "Open"]),
                    MockNode::row(&["2", "Bob", "Closed"]),
                ]),
            ),
        )
    }

    #[test]
    fn test_css_compound_and_combinators() {
        let doc = table_doc();
        assert_eq!(doc.resolve(&Locator::new("table#orders tr")).unwrap().len(), 3);
        assert_eq!(doc.resolve(&Locator::new("table > tr > td")).unwrap().len(), 6);
        assert_eq!(doc.resolve(&Locator::new("th, td")).unwrap().len(), 9);
        assert!(doc.resolve(&Locator::new("tbody tr")).unwrap().is_empty());
    }

    #[test]
    fn test_row_inner_text_is_tab_separated() {
        let doc = table_doc();
        let rows = doc.resolve(&Locator::new("tr")).unwrap();
        assert_eq!(doc.inner_text(rows[1]), "1\tAlice\tOpen");
    }

    #[test]
    fn test_element_path_round_trips_through_both_engines() {
        let doc = table_doc();
        let cell = doc.resolve(&Locator::new("tr").nth(2).locate("td").nth(1)).unwrap()[0];
        let path = doc.element_path(cell);
        assert_eq!(path.css, "html > body > table:nth-child(1) > tr:nth-child(3) > td:nth-child(2)");
        assert_eq!(path.xpath, "/html/body/table[1]/tr[3]/td[2]");
        assert_eq!(doc.resolve(&Locator::new(&path.css)).unwrap(), vec![cell]);
        assert_eq!(
            doc.resolve(&Locator::new(&format!("xpath={}", path.xpath))).unwrap(),
            vec![cell]
        );
    }

    #[test]
    fn test_text_steps() {
        let doc = table_doc();
        let bob = doc.resolve(&Locator::new("tr").filter_text("bob")).unwrap();
        assert_eq!(bob.len(), 1);
        let exact = doc.resolve(&Locator::new("table").get_by_text("Open", true)).unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(doc.nodes[exact[0]].tag, "td");
    }

    #[test]
    fn test_parent_and_next_sibling() {
        let doc = table_doc();
        let alice = Locator::new("td").filter_text_exact("Alice");
        assert_eq!(doc.nodes[doc.resolve(&alice.parent()).unwrap()[0]].tag, "tr");
        let status = doc.resolve(&alice.next_sibling("td")).unwrap();
        assert_eq!(doc.inner_text(status[0]), "Open");
        assert!(doc.resolve(&alice.next_sibling("th")).unwrap().is_empty());
    }

    #[test]
    fn test_unsupported_pseudo_is_an_error() {
        let doc = table_doc();
        assert!(doc.resolve(&Locator::new("tr:hover")).is_err());
    }

    #[test]
    fn test_text_matches_modes() {
        assert!(text_matches("  Order   Total ", "order total", false));
        assert!(!text_matches("Order Total", "order total", true));
        assert!(text_matches(" Total ", "Total", true));
    }
}
