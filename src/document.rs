use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;

use camino::Utf8Path;
use tracing::warn;

use crate::error::SeqpackError;

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const SBOL_COMPONENT: &str = "http://sbols.org/v3#Component";
pub const SBOL_SEQUENCE: &str = "http://sbols.org/v3#Sequence";
pub const SBOL_COLLECTION: &str = "http://sbols.org/v3#Collection";
pub const SBOL_DISPLAY_ID: &str = "http://sbols.org/v3#displayId";
pub const SBOL_NAMESPACE: &str = "http://sbols.org/v3#hasNamespace";
pub const SBOL_TYPE: &str = "http://sbols.org/v3#type";
pub const SBOL_HAS_SEQUENCE: &str = "http://sbols.org/v3#hasSequence";
pub const SBOL_ELEMENTS: &str = "http://sbols.org/v3#elements";
pub const SBOL_ENCODING: &str = "http://sbols.org/v3#encoding";
pub const SBOL_MEMBER: &str = "http://sbols.org/v3#member";
pub const DCTERMS_TITLE: &str = "http://purl.org/dc/terms/title";
pub const DCTERMS_DESCRIPTION: &str = "http://purl.org/dc/terms/description";
pub const SBO_DNA: &str = "https://identifiers.org/SBO:0000251";
pub const IUPAC_DNA_ENCODING: &str = "https://identifiers.org/edam:format_1207";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Term {
    Iri(String),
    Literal(String),
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{iri}>"),
            Term::Literal(text) => write!(f, "\"{}\"", escape_literal(text)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Statement {
    pub subject: String,
    pub predicate: String,
    pub object: Term,
}

impl Statement {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }

    pub fn line(&self) -> String {
        format!("<{}> <{}> {} .\n", self.subject, self.predicate, self.object)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub identity: String,
    pub display_id: String,
    pub namespace: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub types: Vec<String>,
    pub sequences: Vec<String>,
}

impl Component {
    pub fn dna(identity: impl Into<String>, namespace: impl Into<String>) -> Self {
        let identity = identity.into();
        Self {
            display_id: last_segment(&identity).to_string(),
            namespace: namespace.into(),
            name: None,
            description: None,
            types: vec![SBO_DNA.to_string()],
            sequences: Vec::new(),
            identity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub identity: String,
    pub display_id: String,
    pub namespace: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub elements: String,
    pub encoding: String,
}

impl Sequence {
    pub fn dna(
        identity: impl Into<String>,
        namespace: impl Into<String>,
        elements: impl Into<String>,
    ) -> Self {
        let identity = identity.into();
        Self {
            display_id: last_segment(&identity).to_string(),
            namespace: namespace.into(),
            name: None,
            description: None,
            elements: elements.into(),
            encoding: IUPAC_DNA_ENCODING.to_string(),
            identity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub identity: String,
    pub display_id: String,
    pub namespace: String,
    pub name: Option<String>,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopLevel {
    Component(Component),
    Sequence(Sequence),
    Collection(Collection),
}

impl TopLevel {
    pub fn identity(&self) -> &str {
        match self {
            TopLevel::Component(c) => &c.identity,
            TopLevel::Sequence(s) => &s.identity,
            TopLevel::Collection(c) => &c.identity,
        }
    }

    pub fn display_id(&self) -> &str {
        match self {
            TopLevel::Component(c) => &c.display_id,
            TopLevel::Sequence(s) => &s.display_id,
            TopLevel::Collection(c) => &c.display_id,
        }
    }
}

pub fn last_segment(identity: &str) -> &str {
    identity.rsplit('/').next().unwrap_or(identity)
}

pub fn parent_namespace(identity: &str) -> String {
    match identity.rfind('/') {
        Some(idx) => identity[..idx].to_string(),
        None => identity.to_string(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    objects: Vec<TopLevel>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objects(&self) -> &[TopLevel] {
        &self.objects
    }

    pub fn add(&mut self, object: TopLevel) {
        self.objects.push(object);
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.objects.iter().any(|o| o.identity() == identity)
    }

    pub fn find(&self, identity: &str) -> Option<&TopLevel> {
        self.objects.iter().find(|o| o.identity() == identity)
    }

    pub fn find_by_display_id(&self, display_id: &str) -> Option<&TopLevel> {
        self.objects.iter().find(|o| o.display_id() == display_id)
    }

    pub fn find_component(&self, identity: &str) -> Option<&Component> {
        self.objects.iter().find_map(|o| match o {
            TopLevel::Component(c) if c.identity == identity => Some(c),
            _ => None,
        })
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.objects.iter().filter_map(|o| match o {
            TopLevel::Component(c) => Some(c),
            _ => None,
        })
    }

    pub fn remove_identities(&mut self, identities: &BTreeSet<String>) {
        self.objects.retain(|o| !identities.contains(o.identity()));
    }

    pub fn read(path: &Utf8Path) -> Result<Self, SeqpackError> {
        let text = fs::read_to_string(path.as_std_path())
            .map_err(|err| SeqpackError::Filesystem(format!("{path}: {err}")))?;
        Self::parse(&text).map_err(|message| SeqpackError::DocumentParse {
            path: path.to_owned(),
            message,
        })
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        let mut statements = Vec::new();
        for (number, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let statement =
                parse_statement(line).map_err(|err| format!("line {}: {err}", number + 1))?;
            statements.push(statement);
        }
        Ok(Self::from_statements(&statements))
    }

    pub fn from_statements(statements: &[Statement]) -> Self {
        let mut by_subject: BTreeMap<&str, Vec<&Statement>> = BTreeMap::new();
        for statement in statements {
            by_subject
                .entry(statement.subject.as_str())
                .or_default()
                .push(statement);
        }

        let mut doc = Document::new();
        for (subject, group) in by_subject {
            let rdf_type = group.iter().find_map(|s| match (&s.predicate, &s.object) {
                (p, Term::Iri(iri)) if p == RDF_TYPE => Some(iri.as_str()),
                _ => None,
            });
            let object = match rdf_type {
                Some(SBOL_COMPONENT) => TopLevel::Component(component_from(subject, &group)),
                Some(SBOL_SEQUENCE) => TopLevel::Sequence(sequence_from(subject, &group)),
                Some(SBOL_COLLECTION) => TopLevel::Collection(collection_from(subject, &group)),
                other => {
                    warn!(subject, rdf_type = ?other, "skipping subject with unknown type");
                    continue;
                }
            };
            doc.add(object);
        }
        doc
    }

    pub fn to_statements(&self) -> Vec<Statement> {
        let mut statements = Vec::new();
        for object in &self.objects {
            match object {
                TopLevel::Component(c) => {
                    push_common(
                        &mut statements,
                        &c.identity,
                        SBOL_COMPONENT,
                        &c.display_id,
                        &c.namespace,
                        c.name.as_deref(),
                        c.description.as_deref(),
                    );
                    for term in &c.types {
                        statements.push(Statement::new(&c.identity, SBOL_TYPE, Term::Iri(term.clone())));
                    }
                    for seq in &c.sequences {
                        statements.push(Statement::new(
                            &c.identity,
                            SBOL_HAS_SEQUENCE,
                            Term::Iri(seq.clone()),
                        ));
                    }
                }
                TopLevel::Sequence(s) => {
                    push_common(
                        &mut statements,
                        &s.identity,
                        SBOL_SEQUENCE,
                        &s.display_id,
                        &s.namespace,
                        s.name.as_deref(),
                        s.description.as_deref(),
                    );
                    statements.push(Statement::new(
                        &s.identity,
                        SBOL_ELEMENTS,
                        Term::Literal(s.elements.clone()),
                    ));
                    statements.push(Statement::new(
                        &s.identity,
                        SBOL_ENCODING,
                        Term::Iri(s.encoding.clone()),
                    ));
                }
                TopLevel::Collection(c) => {
                    push_common(
                        &mut statements,
                        &c.identity,
                        SBOL_COLLECTION,
                        &c.display_id,
                        &c.namespace,
                        c.name.as_deref(),
                        None,
                    );
                    for member in &c.members {
                        statements.push(Statement::new(
                            &c.identity,
                            SBOL_MEMBER,
                            Term::Iri(member.clone()),
                        ));
                    }
                }
            }
        }
        statements
    }

    pub fn to_sorted_ntriples(&self) -> String {
        sorted_ntriples(&self.to_statements())
    }
}

fn push_common(
    statements: &mut Vec<Statement>,
    identity: &str,
    rdf_type: &str,
    display_id: &str,
    namespace: &str,
    name: Option<&str>,
    description: Option<&str>,
) {
    statements.push(Statement::new(identity, RDF_TYPE, Term::Iri(rdf_type.to_string())));
    statements.push(Statement::new(
        identity,
        SBOL_DISPLAY_ID,
        Term::Literal(display_id.to_string()),
    ));
    statements.push(Statement::new(
        identity,
        SBOL_NAMESPACE,
        Term::Iri(namespace.to_string()),
    ));
    if let Some(name) = name {
        statements.push(Statement::new(identity, DCTERMS_TITLE, Term::Literal(name.to_string())));
    }
    if let Some(description) = description {
        statements.push(Statement::new(
            identity,
            DCTERMS_DESCRIPTION,
            Term::Literal(description.to_string()),
        ));
    }
}

fn literal_value(group: &[&Statement], predicate: &str) -> Option<String> {
    group.iter().find_map(|s| match (&s.predicate, &s.object) {
        (p, Term::Literal(text)) if p == predicate => Some(text.clone()),
        _ => None,
    })
}

fn iri_value(group: &[&Statement], predicate: &str) -> Option<String> {
    group.iter().find_map(|s| match (&s.predicate, &s.object) {
        (p, Term::Iri(iri)) if p == predicate => Some(iri.clone()),
        _ => None,
    })
}

fn iri_values(group: &[&Statement], predicate: &str) -> Vec<String> {
    group
        .iter()
        .filter_map(|s| match (&s.predicate, &s.object) {
            (p, Term::Iri(iri)) if p == predicate => Some(iri.clone()),
            _ => None,
        })
        .collect()
}

fn component_from(identity: &str, group: &[&Statement]) -> Component {
    Component {
        identity: identity.to_string(),
        display_id: literal_value(group, SBOL_DISPLAY_ID)
            .unwrap_or_else(|| last_segment(identity).to_string()),
        namespace: iri_value(group, SBOL_NAMESPACE).unwrap_or_else(|| parent_namespace(identity)),
        name: literal_value(group, DCTERMS_TITLE),
        description: literal_value(group, DCTERMS_DESCRIPTION),
        types: iri_values(group, SBOL_TYPE),
        sequences: iri_values(group, SBOL_HAS_SEQUENCE),
    }
}

fn sequence_from(identity: &str, group: &[&Statement]) -> Sequence {
    Sequence {
        identity: identity.to_string(),
        display_id: literal_value(group, SBOL_DISPLAY_ID)
            .unwrap_or_else(|| last_segment(identity).to_string()),
        namespace: iri_value(group, SBOL_NAMESPACE).unwrap_or_else(|| parent_namespace(identity)),
        name: literal_value(group, DCTERMS_TITLE),
        description: literal_value(group, DCTERMS_DESCRIPTION),
        elements: literal_value(group, SBOL_ELEMENTS).unwrap_or_default(),
        encoding: iri_value(group, SBOL_ENCODING).unwrap_or_else(|| IUPAC_DNA_ENCODING.to_string()),
    }
}

fn collection_from(identity: &str, group: &[&Statement]) -> Collection {
    Collection {
        identity: identity.to_string(),
        display_id: literal_value(group, SBOL_DISPLAY_ID)
            .unwrap_or_else(|| last_segment(identity).to_string()),
        namespace: iri_value(group, SBOL_NAMESPACE).unwrap_or_else(|| parent_namespace(identity)),
        name: literal_value(group, DCTERMS_TITLE),
        members: iri_values(group, SBOL_MEMBER),
    }
}

pub fn rewrite_object_references(
    statements: &mut Vec<Statement>,
    plan: &BTreeMap<String, String>,
) {
    if plan.is_empty() {
        return;
    }
    // object positions only; subjects and predicates stay as written
    for statement in statements.iter_mut() {
        let replacement = match &statement.object {
            Term::Iri(iri) => plan.get(iri).cloned(),
            Term::Literal(_) => None,
        };
        if let Some(replacement) = replacement {
            statement.object = Term::Iri(replacement);
        }
    }
}

pub fn sorted_ntriples(statements: &[Statement]) -> String {
    let mut lines: Vec<String> = statements.iter().map(Statement::line).collect();
    lines.sort();
    lines.dedup();
    lines.concat()
}

fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_literal(text: &str) -> Result<String, String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => return Err(format!("unsupported escape \\{other}")),
            None => return Err("dangling escape at end of literal".to_string()),
        }
    }
    Ok(out)
}

pub fn parse_statement(line: &str) -> Result<Statement, String> {
    let rest = line.trim_start();
    let (subject, rest) = parse_iri(rest)?;
    let rest = rest.trim_start();
    let (predicate, rest) = parse_iri(rest)?;
    let rest = rest.trim_start();
    let (object, rest) = parse_term(rest)?;
    let rest = rest.trim_start();
    if !rest.starts_with('.') {
        return Err("statement does not end with '.'".to_string());
    }
    Ok(Statement::new(subject, predicate, object))
}

fn parse_iri(text: &str) -> Result<(String, &str), String> {
    let rest = text
        .strip_prefix('<')
        .ok_or_else(|| format!("expected IRI at: {text}"))?;
    let end = rest
        .find('>')
        .ok_or_else(|| "unterminated IRI".to_string())?;
    Ok((rest[..end].to_string(), &rest[end + 1..]))
}

fn parse_term(text: &str) -> Result<(Term, &str), String> {
    if text.starts_with('<') {
        let (iri, rest) = parse_iri(text)?;
        return Ok((Term::Iri(iri), rest));
    }
    let rest = text
        .strip_prefix('"')
        .ok_or_else(|| format!("expected IRI or literal at: {text}"))?;
    let mut end = None;
    let mut escaped = false;
    for (idx, ch) in rest.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => {
                end = Some(idx);
                break;
            }
            _ => {}
        }
    }
    let end = end.ok_or_else(|| "unterminated literal".to_string())?;
    let value = unescape_literal(&rest[..end])?;
    let mut tail = &rest[end + 1..];
    // tolerate a datatype annotation on input; none are ever written
    if let Some(stripped) = tail.strip_prefix("^^") {
        let (_, after) = parse_iri(stripped)?;
        tail = after;
    }
    Ok((Term::Literal(value), tail))
}
