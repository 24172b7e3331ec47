/*! The inclusion resolver: one ordered, lazy token stream for a whole
   document.

   `\input{f}`, `\import{path}{name}` and `\include{f}` directives are
   replaced in place by the full recursive expansion of the referenced
   file, pre-order and depth-first. Expansion is driven by an explicit
   stack of per-file frames rather than recursion, so arbitrarily deep
   inclusion chains cannot exhaust the call stack.

   Cycle detection is chain-local: the set of files currently on the frame
   stack. The same file included twice from unrelated branches is legal and
   is re-resolved in full both times.
*/

use crate::errors::TexError;
use crate::tex::token::{SourceRef, Token};
use crate::tex::tokenizer::TokenStream;
use crate::tex::{read_argument, Argument};
use log::debug;
use path_dedot::ParseDot;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

struct Frame {
    path: PathBuf,
    tokens: TokenStream,
}

pub struct InclusionResolver {
    /// Resolves the root document, and inclusion targets whose including
    /// frame has no parent directory. Explicit, never ambient
    /// working-directory state.
    base: PathBuf,
    frames: Vec<Frame>,
    /// Normalized paths of every file on the current inclusion chain.
    chain: FxHashSet<PathBuf>,
    /// Tokens consumed while probing for a directive argument that turned
    /// out not to be one; replayed before pulling from the frames again.
    pending: VecDeque<Token>,
    /// `\includeonly` selection, once seen. `None` means include everything.
    include_only: Option<FxHashSet<String>>,
    done: bool,
}

impl InclusionResolver {
    /// Opens `root` (resolved against `base_dir` if relative) as the
    /// document root. Inclusion targets encountered later resolve against
    /// the directory of the file that includes them.
    pub fn open(root: &Path, base_dir: &Path) -> Result<Self, TexError> {
        let root_path = if root.is_absolute() {
            root.to_path_buf()
        } else {
            base_dir.join(root)
        };
        let normalized = root_path.parse_dot().map(|p| p.into_owned()).ok();
        let root_path = normalized.unwrap_or(root_path);
        let tokens = TokenStream::from_file(&root_path)?;
        let mut chain = FxHashSet::default();
        chain.insert(root_path.clone());
        Ok(Self {
            base: base_dir.to_path_buf(),
            frames: vec![Frame {
                path: root_path,
                tokens,
            }],
            chain,
            pending: VecDeque::new(),
            include_only: None,
            done: false,
        })
    }

    /// Next token of the current deepest file, popping exhausted frames.
    fn next_raw(&mut self) -> Option<Token> {
        loop {
            let frame = self.frames.last_mut()?;
            match frame.tokens.next() {
                Some(t) => return Some(t),
                None => {
                    let frame = self.frames.pop().expect("frame stack underflow");
                    self.chain.remove(&frame.path);
                }
            }
        }
    }

    /// Reads a directive argument from the frame the directive came from.
    /// Argument groups never span file boundaries.
    fn read_directive_argument(&mut self) -> Result<Argument, TexError> {
        let frame = match self.frames.last_mut() {
            Some(f) => f,
            None => return Ok(Argument::Bare(Vec::new())),
        };
        let mut tokens = frame.tokens.by_ref().map(Ok::<_, TexError>);
        read_argument(&mut tokens)
    }

    fn replay(&mut self, directive: Token, parts: Vec<Vec<Token>>) {
        self.pending.push_back(directive);
        for part in parts {
            self.pending.extend(part);
        }
    }

    /// Locates `target` relative to the including file's directory, so
    /// nested files resolve their own neighbors. Candidate order: the
    /// literal path first, then with a `.tex` extension appended. Returns
    /// the normalized path.
    fn resolve_path(&self, target: &Path) -> Option<PathBuf> {
        let dir = self
            .frames
            .last()
            .and_then(|frame| frame.path.parent())
            .unwrap_or(&self.base);
        let candidate = if target.is_absolute() {
            target.to_path_buf()
        } else {
            dir.join(target)
        };
        let found = if candidate.is_file() {
            candidate
        } else {
            let mut s = candidate.into_os_string();
            s.push(".tex");
            let with_ext = PathBuf::from(s);
            if !with_ext.is_file() {
                return None;
            }
            with_ext
        };
        let normalized = found.parse_dot().map(|p| p.into_owned()).ok();
        Some(normalized.unwrap_or(found))
    }

    fn push_include(&mut self, target: &Path, at: &SourceRef) -> Result<(), TexError> {
        let path = self
            .resolve_path(target)
            .ok_or_else(|| TexError::FileResolution {
                target: target.display().to_string(),
                at: at.clone(),
            })?;
        if self.chain.contains(&path) {
            return Err(TexError::CyclicInclusion {
                path,
                at: at.clone(),
            });
        }
        debug!(target:"resolver", "splicing {} (included at {})", path.display(), at);
        let tokens = TokenStream::from_file(&path)?;
        self.chain.insert(path.clone());
        self.frames.push(Frame { path, tokens });
        Ok(())
    }

    /// Handles one inclusion directive. Returns `Ok(())` after either
    /// pushing a frame, queueing a replay, or dropping a deselected
    /// `\include`.
    fn splice(&mut self, directive: Token, kind: DirectiveKind) -> Result<(), TexError> {
        let first = match self.read_directive_argument()? {
            Argument::Group(g) => g,
            Argument::Bare(rest) => {
                // no brace group follows: not an inclusion after all
                self.replay(directive, vec![rest]);
                return Ok(());
            }
        };
        let target = match kind {
            DirectiveKind::Input => PathBuf::from(&first.text),
            DirectiveKind::Import => match self.read_directive_argument()? {
                Argument::Group(second) => Path::new(&first.text).join(&second.text),
                Argument::Bare(rest) => {
                    self.replay(directive, vec![first.consumed, rest]);
                    return Ok(());
                }
            },
            DirectiveKind::Include => {
                if let Some(only) = &self.include_only {
                    if !only.contains(first.text.trim()) {
                        debug!(target:"resolver", "skipping \\include{{{}}}: deselected by \\includeonly", first.text);
                        return Ok(());
                    }
                }
                PathBuf::from(&first.text)
            }
            DirectiveKind::IncludeOnly => {
                let only = first
                    .text
                    .split(',')
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty())
                    .collect();
                self.include_only = Some(only);
                return Ok(());
            }
        };
        self.push_include(&target, &directive.at)
    }
}

#[derive(Copy, Clone)]
enum DirectiveKind {
    Input,
    Import,
    Include,
    IncludeOnly,
}

impl Iterator for InclusionResolver {
    type Item = Result<Token, TexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if let Some(t) = self.pending.pop_front() {
                return Some(Ok(t));
            }
            let tok = self.next_raw()?;
            let kind = match tok.control_word() {
                Some("input") => DirectiveKind::Input,
                Some("import") => DirectiveKind::Import,
                Some("include") => DirectiveKind::Include,
                Some("includeonly") => DirectiveKind::IncludeOnly,
                _ => return Some(Ok(tok)),
            };
            if let Err(e) = self.splice(tok, kind) {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}
