//! Recursive descent parser producing an unattributed tree.
//!
//! The outermost node starting at a token owns that token's prefix; nested
//! nodes starting at the same token get an empty prefix. `prefix()` hands out
//! a token's trivia once, and `hoist` moves it up when a wrapper node is only
//! recognised after its first child was built (`a.b`, `x + y`, `List<T>`).

use std::path::Path;
use std::sync::Arc;

use super::lexer::{is_keyword, tokenize, unescape, Token, TokenKind};
use crate::error::ParseError;
use crate::tree::*;

type PResult<T> = Result<T, ParseError>;

const MODIFIERS: &[&str] = &[
    "public", "protected", "private", "static", "final", "abstract", "native", "synchronized",
    "transient", "volatile", "strictfp", "default",
];

#[derive(Clone, Copy)]
struct Checkpoint {
    pos: usize,
    hoisted: Option<usize>,
}

pub(crate) struct Parser<'a> {
    path: &'a Path,
    source: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
    /// Token whose prefix was already handed out.
    hoisted: Option<usize>,
}

pub(crate) fn parse_compilation_unit(path: &Path, source: &str) -> PResult<CompilationUnit> {
    let tokens = tokenize(path, source)?;
    let mut parser = Parser {
        path,
        source,
        tokens,
        pos: 0,
        hoisted: None,
    };
    parser.compilation_unit()
}

fn take_prefix(expr: &mut Expression) -> Space {
    macro_rules! take {
        ($node:expr) => {
            std::mem::take(&mut Arc::make_mut($node).prefix)
        };
    }
    match expr {
        Expression::Identifier(n) => take!(n),
        Expression::Literal(n) => take!(n),
        Expression::FieldAccess(n) => take!(n),
        Expression::MethodInvocation(n) => take!(n),
        Expression::NewClass(n) => take!(n),
        Expression::NewArray(n) => take!(n),
        Expression::Lambda(n) => take!(n),
        Expression::MemberReference(n) => take!(n),
        Expression::Binary(n) => take!(n),
        Expression::Unary(n) => take!(n),
        Expression::Assignment(n) => take!(n),
        Expression::Ternary(n) => take!(n),
        Expression::Parentheses(n) => take!(n),
        Expression::ArrayAccess(n) => take!(n),
        Expression::TypeCast(n) => take!(n),
    }
}

fn hoist(mut expr: Expression) -> (Space, Expression) {
    let prefix = take_prefix(&mut expr);
    (prefix, expr)
}

fn hoist_type(mut tree: TypeTree) -> (Space, TypeTree) {
    let prefix = match &mut tree {
        TypeTree::Named(e) => take_prefix(e),
        TypeTree::Primitive(n) => std::mem::take(&mut Arc::make_mut(n).prefix),
        TypeTree::Parameterized(n) => std::mem::take(&mut Arc::make_mut(n).prefix),
        TypeTree::Array(n) => std::mem::take(&mut Arc::make_mut(n).prefix),
        TypeTree::Wildcard(n) => std::mem::take(&mut Arc::make_mut(n).prefix),
    };
    (prefix, tree)
}

impl<'a> Parser<'a> {
    // -----------------------------------------------------------------------
    // Token plumbing
    // -----------------------------------------------------------------------

    fn peek(&self) -> &Token<'a> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> &Token<'a> {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)]
    }

    fn is(&self, text: &str) -> bool {
        self.peek().is(text)
    }

    fn is_at(&self, n: usize, text: &str) -> bool {
        self.peek_at(n).is(text)
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn is_name_at(&self, n: usize) -> bool {
        let token = self.peek_at(n);
        token.kind == TokenKind::Identifier && !is_keyword(token.text)
    }

    fn is_primitive(&self) -> bool {
        self.peek().kind == TokenKind::Identifier && Primitive::from_keyword(self.peek().text).is_some()
    }

    /// Prefix of the current token, handed out once.
    fn prefix(&mut self) -> Space {
        if self.hoisted == Some(self.pos) {
            Space::EMPTY
        } else {
            self.hoisted = Some(self.pos);
            Space::new(self.peek().prefix)
        }
    }

    fn bump(&mut self) -> Token<'a> {
        let token = *self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn next_token(&mut self) -> (Space, Token<'a>) {
        let prefix = self.prefix();
        (prefix, self.bump())
    }

    fn expect(&mut self, text: &str) -> PResult<Space> {
        if !self.is(text) {
            return Err(self.error(format!("expected '{text}'")));
        }
        Ok(self.next_token().0)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let token = self.peek();
        let found = if token.kind == TokenKind::Eof {
            "end of input".to_string()
        } else {
            format!("'{}'", token.text)
        };
        ParseError::at(
            self.path,
            self.source,
            token.offset,
            format!("{}, found {}", message.into(), found),
        )
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            hoisted: self.hoisted,
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.pos = checkpoint.pos;
        self.hoisted = checkpoint.hoisted;
    }

    fn ident(&mut self) -> PResult<Arc<Identifier>> {
        if !self.is_name_at(0) {
            return Err(self.error("expected identifier"));
        }
        let (prefix, token) = self.next_token();
        Ok(Arc::new(Identifier::new(prefix, token.text)))
    }

    /// Identifier that may be a keyword (`this`, `class`, `new`).
    fn word(&mut self) -> PResult<Arc<Identifier>> {
        if self.peek().kind != TokenKind::Identifier {
            return Err(self.error("expected identifier"));
        }
        let (prefix, token) = self.next_token();
        Ok(Arc::new(Identifier::new(prefix, token.text)))
    }

    fn container<T>(
        &mut self,
        open: &str,
        close: &str,
        mut element: impl FnMut(&mut Self) -> PResult<T>,
    ) -> PResult<Container<T>> {
        let before = self.expect(open)?;
        let mut elements = Vec::new();
        if !self.is(close) {
            loop {
                let value = element(self)?;
                if self.is(",") {
                    let after = self.expect(",")?;
                    elements.push(Padded { element: value, after });
                } else {
                    elements.push(Padded::new(value));
                    break;
                }
            }
        }
        let end = self.expect(close)?;
        Ok(Container {
            before,
            elements,
            end,
        })
    }

    /// `keyword T, U, ..` with no closing delimiter.
    fn type_list(&mut self, keyword: &str) -> PResult<Container<TypeTree>> {
        let before = self.expect(keyword)?;
        let mut elements = Vec::new();
        loop {
            let tree = self.type_tree()?;
            if self.is(",") {
                let after = self.expect(",")?;
                elements.push(Padded { element: tree, after });
            } else {
                elements.push(Padded::new(tree));
                break;
            }
        }
        Ok(Container {
            before,
            elements,
            end: Space::EMPTY,
        })
    }

    // -----------------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------------

    fn compilation_unit(&mut self) -> PResult<CompilationUnit> {
        let package = if self.is("package") {
            let prefix = self.expect("package")?;
            let name = self.qualified_name()?;
            let after = self.expect(";")?;
            Some(Padded {
                element: Arc::new(Package {
                    id: Id::next(),
                    prefix,
                    name,
                }),
                after,
            })
        } else {
            None
        };

        let mut imports = Vec::new();
        while self.is("import") {
            let prefix = self.expect("import")?;
            let static_prefix = if self.is("static") {
                Some(self.expect("static")?)
            } else {
                None
            };
            let qualid = self.import_name()?;
            let after = self.expect(";")?;
            imports.push(Padded {
                element: Arc::new(Import {
                    id: Id::next(),
                    prefix,
                    static_prefix,
                    qualid,
                }),
                after,
            });
        }

        let mut classes = Vec::new();
        while !self.at_eof() {
            let (prefix, annotations, modifiers) = self.modifiers()?;
            if !(self.is("class") || self.is("interface")) {
                return Err(self.error("expected class or interface declaration"));
            }
            classes.push(self.class_declaration(prefix, annotations, modifiers)?);
        }

        Ok(CompilationUnit {
            id: Id::next(),
            source_path: self.path.to_path_buf(),
            package,
            imports,
            classes,
            eof: Space::new(self.peek().prefix),
        })
    }

    fn import_name(&mut self) -> PResult<Arc<FieldAccess>> {
        let mut name = Expression::Identifier(self.ident()?);
        while self.is(".") {
            let before = self.expect(".")?;
            let segment = if self.is("*") {
                let (prefix, _) = self.next_token();
                Arc::new(Identifier::new(prefix, "*"))
            } else {
                self.ident()?
            };
            let (prefix, target) = hoist(name);
            name = Expression::FieldAccess(Arc::new(FieldAccess {
                id: Id::next(),
                prefix,
                target,
                name: LeftPadded {
                    before,
                    element: segment,
                },
                ty: JavaType::Unknown,
            }));
        }
        match name {
            Expression::FieldAccess(fa) => Ok(fa),
            _ => Err(self.error("expected qualified import name")),
        }
    }

    fn qualified_name(&mut self) -> PResult<Expression> {
        let mut name = Expression::Identifier(self.ident()?);
        while self.is(".") && self.is_name_at(1) {
            let before = self.expect(".")?;
            let segment = self.ident()?;
            let (prefix, target) = hoist(name);
            name = Expression::FieldAccess(Arc::new(FieldAccess {
                id: Id::next(),
                prefix,
                target,
                name: LeftPadded {
                    before,
                    element: segment,
                },
                ty: JavaType::Unknown,
            }));
        }
        Ok(name)
    }

    /// Leading annotations and modifiers; the returned prefix belongs to the
    /// declaration that follows.
    fn modifiers(&mut self) -> PResult<(Space, Vec<Arc<Annotation>>, Vec<Modifier>)> {
        let prefix = self.prefix();
        let mut annotations = Vec::new();
        let mut modifiers = Vec::new();
        loop {
            if self.is("@") && !self.is_at(1, "interface") {
                if !modifiers.is_empty() {
                    return Err(self.error("annotations after modifiers are not supported"));
                }
                annotations.push(self.annotation()?);
            } else if self.peek().kind == TokenKind::Identifier
                && MODIFIERS.contains(&self.peek().text)
                && !(self.is("default") && self.is_at(1, ":"))
            {
                let (prefix, token) = self.next_token();
                modifiers.push(Modifier {
                    id: Id::next(),
                    prefix,
                    keyword: token.text.to_string(),
                });
            } else {
                break;
            }
        }
        Ok((prefix, annotations, modifiers))
    }

    fn annotation(&mut self) -> PResult<Arc<Annotation>> {
        let prefix = self.expect("@")?;
        let annotation_type = self.qualified_name()?;
        let arguments = if self.is("(") {
            Some(self.container("(", ")", |p| p.annotation_argument())?)
        } else {
            None
        };
        Ok(Arc::new(Annotation {
            id: Id::next(),
            prefix,
            annotation_type,
            arguments,
        }))
    }

    fn annotation_argument(&mut self) -> PResult<Expression> {
        if self.is_name_at(0) && self.is_at(1, "=") {
            let (prefix, variable) = hoist(Expression::Identifier(self.ident()?));
            let before = self.expect("=")?;
            let value = self.element_value()?;
            return Ok(Expression::Assignment(Arc::new(Assignment {
                id: Id::next(),
                prefix,
                variable,
                operator: LeftPadded {
                    before,
                    element: AssignOp::Assign,
                },
                value,
                ty: JavaType::Unknown,
            })));
        }
        self.element_value()
    }

    fn element_value(&mut self) -> PResult<Expression> {
        if self.is("{") {
            return self.array_initializer(|p| p.element_value());
        }
        if self.is("@") {
            return Err(self.error("nested annotations are not supported"));
        }
        self.ternary()
    }

    fn class_declaration(
        &mut self,
        prefix: Space,
        leading_annotations: Vec<Arc<Annotation>>,
        modifiers: Vec<Modifier>,
    ) -> PResult<Arc<ClassDeclaration>> {
        let (keyword_prefix, token) = self.next_token();
        let keyword = match token.text {
            "class" => ClassKeyword::Class,
            "interface" => ClassKeyword::Interface,
            _ => return Err(self.error("expected 'class' or 'interface'")),
        };
        let name = self.ident()?;
        if self.is("<") {
            return Err(self.error("generic type declarations are not supported"));
        }
        let mut extends = None;
        let mut implements = None;
        if self.is("extends") {
            match keyword {
                ClassKeyword::Class => {
                    let before = self.expect("extends")?;
                    extends = Some(LeftPadded {
                        before,
                        element: self.type_tree()?,
                    });
                }
                ClassKeyword::Interface => implements = Some(self.type_list("extends")?),
            }
        }
        if keyword == ClassKeyword::Class && self.is("implements") {
            implements = Some(self.type_list("implements")?);
        }
        let body = self.class_body()?;
        Ok(Arc::new(ClassDeclaration {
            id: Id::next(),
            prefix,
            leading_annotations,
            modifiers,
            keyword_prefix,
            keyword,
            name,
            extends,
            implements,
            body,
            ty: None,
        }))
    }

    fn class_body(&mut self) -> PResult<Arc<Block>> {
        let prefix = self.expect("{")?;
        let mut statements = Vec::new();
        while !self.is("}") {
            if self.at_eof() {
                return Err(self.error("expected '}'"));
            }
            if self.is(";") {
                let prefix = self.expect(";")?;
                statements.push(Padded::new(Statement::Empty(Arc::new(Empty {
                    id: Id::next(),
                    prefix,
                }))));
                continue;
            }
            statements.push(self.member()?);
        }
        let end = self.expect("}")?;
        Ok(Arc::new(Block {
            id: Id::next(),
            prefix,
            statements,
            end,
        }))
    }

    fn member(&mut self) -> PResult<Padded<Statement>> {
        let (prefix, annotations, modifiers) = self.modifiers()?;
        if self.is("class") || self.is("interface") {
            let class = self.class_declaration(prefix, annotations, modifiers)?;
            return Ok(Padded::new(Statement::Class(class)));
        }
        if self.is("{") || self.is("<") || self.is("enum") || self.is("@") || self.is("record") {
            return Err(self.error("unsupported class member"));
        }
        if self.is_name_at(0) && self.is_at(1, "(") {
            return self.method_declaration(prefix, annotations, modifiers, None);
        }
        let type_expr = self.type_tree()?;
        if self.is_name_at(0) && self.is_at(1, "(") {
            return self.method_declaration(prefix, annotations, modifiers, Some(type_expr));
        }
        let variables = self.variables()?;
        let after = self.expect(";")?;
        Ok(Padded {
            element: Statement::VariableDeclarations(Arc::new(VariableDeclarations {
                id: Id::next(),
                prefix,
                leading_annotations: annotations,
                modifiers,
                type_expr: Some(type_expr),
                varargs: None,
                variables,
            })),
            after,
        })
    }

    fn method_declaration(
        &mut self,
        prefix: Space,
        leading_annotations: Vec<Arc<Annotation>>,
        modifiers: Vec<Modifier>,
        return_type: Option<TypeTree>,
    ) -> PResult<Padded<Statement>> {
        let name = self.ident()?;
        let parameters = self.container("(", ")", |p| p.formal_parameter())?;
        let throws = if self.is("throws") {
            Some(self.type_list("throws")?)
        } else {
            None
        };
        let (body, after) = if self.is("{") {
            (Some(self.block()?), Space::EMPTY)
        } else {
            (None, self.expect(";")?)
        };
        Ok(Padded {
            element: Statement::Method(Arc::new(MethodDeclaration {
                id: Id::next(),
                prefix,
                leading_annotations,
                modifiers,
                return_type,
                name,
                parameters,
                throws,
                body,
                method_type: None,
            })),
            after,
        })
    }

    fn formal_parameter(&mut self) -> PResult<Arc<VariableDeclarations>> {
        let (prefix, leading_annotations, modifiers) = self.modifiers()?;
        let type_expr = self.type_tree()?;
        let varargs = if self.is("...") {
            Some(self.expect("...")?)
        } else {
            None
        };
        let variable = self.named_variable(false)?;
        Ok(Arc::new(VariableDeclarations {
            id: Id::next(),
            prefix,
            leading_annotations,
            modifiers,
            type_expr: Some(type_expr),
            varargs,
            variables: vec![Padded::new(variable)],
        }))
    }

    fn named_variable(&mut self, with_initializer: bool) -> PResult<Arc<NamedVariable>> {
        let prefix = self.prefix();
        let name = self.ident()?;
        if self.is("[") {
            return Err(self.error("array dimensions after a variable name are not supported"));
        }
        let initializer = if with_initializer && self.is("=") {
            let before = self.expect("=")?;
            let element = if self.is("{") {
                self.array_initializer(|p| p.variable_initializer())?
            } else {
                self.expression()?
            };
            Some(LeftPadded { before, element })
        } else {
            None
        };
        Ok(Arc::new(NamedVariable {
            id: Id::next(),
            prefix,
            name,
            initializer,
            ty: JavaType::Unknown,
        }))
    }

    fn variable_initializer(&mut self) -> PResult<Expression> {
        if self.is("{") {
            self.array_initializer(|p| p.variable_initializer())
        } else {
            self.expression()
        }
    }

    fn variables(&mut self) -> PResult<Vec<Padded<Arc<NamedVariable>>>> {
        let mut variables = Vec::new();
        loop {
            let variable = self.named_variable(true)?;
            if self.is(",") {
                let after = self.expect(",")?;
                variables.push(Padded {
                    element: variable,
                    after,
                });
            } else {
                variables.push(Padded::new(variable));
                return Ok(variables);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn block(&mut self) -> PResult<Arc<Block>> {
        let prefix = self.expect("{")?;
        let mut statements = Vec::new();
        while !self.is("}") {
            if self.at_eof() {
                return Err(self.error("expected '}'"));
            }
            statements.push(self.block_statement()?);
        }
        let end = self.expect("}")?;
        Ok(Arc::new(Block {
            id: Id::next(),
            prefix,
            statements,
            end,
        }))
    }

    fn block_statement(&mut self) -> PResult<Padded<Statement>> {
        if self.is("{") {
            return Ok(Padded::new(Statement::Block(self.block()?)));
        }
        if self.is(";") {
            let prefix = self.expect(";")?;
            return Ok(Padded::new(Statement::Empty(Arc::new(Empty {
                id: Id::next(),
                prefix,
            }))));
        }
        if self.is("return") {
            let prefix = self.expect("return")?;
            let expression = if self.is(";") {
                None
            } else {
                Some(self.expression()?)
            };
            let after = self.expect(";")?;
            return Ok(Padded {
                element: Statement::Return(Arc::new(Return {
                    id: Id::next(),
                    prefix,
                    expression,
                })),
                after,
            });
        }
        if self.is("throw") {
            let prefix = self.expect("throw")?;
            let exception = self.expression()?;
            let after = self.expect(";")?;
            return Ok(Padded {
                element: Statement::Throw(Arc::new(Throw {
                    id: Id::next(),
                    prefix,
                    exception,
                })),
                after,
            });
        }
        if self.is("if") {
            return self.if_statement();
        }
        if self.is("while") {
            let prefix = self.expect("while")?;
            let condition = self.control_parentheses()?;
            let body = self.block_statement()?;
            return Ok(Padded::new(Statement::While(Arc::new(WhileLoop {
                id: Id::next(),
                prefix,
                condition,
                body,
            }))));
        }
        if self.is("for") {
            return self.for_statement();
        }
        if self.is("try") {
            return self.try_statement();
        }
        if self.is("do") {
            let prefix = self.expect("do")?;
            let body = self.block_statement()?;
            let while_prefix = self.expect("while")?;
            let condition = self.control_parentheses()?;
            let after = self.expect(";")?;
            return Ok(Padded {
                element: Statement::DoWhile(Arc::new(DoWhileLoop {
                    id: Id::next(),
                    prefix,
                    body,
                    while_prefix,
                    condition,
                })),
                after,
            });
        }
        if self.is("switch") {
            return self.switch_statement();
        }
        if self.is("break") || self.is("continue") {
            let keyword = self.peek().text;
            let prefix = self.expect(keyword)?;
            let label = if self.is_name_at(0) { Some(self.ident()?) } else { None };
            let after = self.expect(";")?;
            let element = if keyword == "break" {
                Statement::Break(Arc::new(Break {
                    id: Id::next(),
                    prefix,
                    label,
                }))
            } else {
                Statement::Continue(Arc::new(Continue {
                    id: Id::next(),
                    prefix,
                    label,
                }))
            };
            return Ok(Padded { element, after });
        }
        if self.is("class") || ((self.is("final") || self.is("abstract")) && self.is_at(1, "class")) {
            let (prefix, annotations, modifiers) = self.modifiers()?;
            let class = self.class_declaration(prefix, annotations, modifiers)?;
            return Ok(Padded::new(Statement::Class(class)));
        }
        if self.is("final") || self.is("@") || self.is_local_variable_declaration() {
            let decls = self.local_variable_declaration()?;
            let after = self.expect(";")?;
            return Ok(Padded {
                element: Statement::VariableDeclarations(decls),
                after,
            });
        }
        let expression = self.expression()?;
        let after = self.expect(";")?;
        Ok(Padded {
            element: Statement::Expression(expression),
            after,
        })
    }

    fn is_local_variable_declaration(&mut self) -> bool {
        if self.is_primitive() && !self.is_at(1, ".") {
            return true;
        }
        if !self.is_name_at(0) {
            return false;
        }
        let checkpoint = self.checkpoint();
        let declares = self.type_tree().is_ok()
            && self.is_name_at(0)
            && (self.is_at(1, "=") || self.is_at(1, ";") || self.is_at(1, ",") || self.is_at(1, ":"));
        self.restore(checkpoint);
        declares
    }

    fn local_variable_declaration(&mut self) -> PResult<Arc<VariableDeclarations>> {
        let (prefix, leading_annotations, modifiers) = self.modifiers()?;
        let type_expr = self.type_tree()?;
        let variables = self.variables()?;
        Ok(Arc::new(VariableDeclarations {
            id: Id::next(),
            prefix,
            leading_annotations,
            modifiers,
            type_expr: Some(type_expr),
            varargs: None,
            variables,
        }))
    }

    fn control_parentheses(&mut self) -> PResult<ControlParentheses> {
        let prefix = self.expect("(")?;
        let element = self.expression()?;
        let after = self.expect(")")?;
        Ok(ControlParentheses {
            prefix,
            tree: Padded { element, after },
        })
    }

    fn if_statement(&mut self) -> PResult<Padded<Statement>> {
        let prefix = self.expect("if")?;
        let condition = self.control_parentheses()?;
        let then_part = self.block_statement()?;
        let else_part = if self.is("else") {
            let prefix = self.expect("else")?;
            Some(Else {
                id: Id::next(),
                prefix,
                body: self.block_statement()?,
            })
        } else {
            None
        };
        Ok(Padded::new(Statement::If(Arc::new(If {
            id: Id::next(),
            prefix,
            condition,
            then_part,
            else_part,
        }))))
    }

    fn for_statement(&mut self) -> PResult<Padded<Statement>> {
        let prefix = self.expect("for")?;
        let control_prefix = self.expect("(")?;

        let checkpoint = self.checkpoint();
        let for_each = self.modifiers().is_ok()
            && self.type_tree().is_ok()
            && self.is_name_at(0)
            && self.is_at(1, ":");
        self.restore(checkpoint);

        if for_each {
            let (decl_prefix, leading_annotations, modifiers) = self.modifiers()?;
            let type_expr = self.type_tree()?;
            let variable = self.named_variable(false)?;
            let colon = self.expect(":")?;
            let iterable = self.expression()?;
            let close = self.expect(")")?;
            let body = self.block_statement()?;
            let decls = Arc::new(VariableDeclarations {
                id: Id::next(),
                prefix: decl_prefix,
                leading_annotations,
                modifiers,
                type_expr: Some(type_expr),
                varargs: None,
                variables: vec![Padded::new(variable)],
            });
            return Ok(Padded::new(Statement::ForEach(Arc::new(ForEachLoop {
                id: Id::next(),
                prefix,
                control: ForEachControl {
                    prefix: control_prefix,
                    variable: Padded {
                        element: decls,
                        after: colon,
                    },
                    iterable: Padded {
                        element: iterable,
                        after: close,
                    },
                },
                body,
            }))));
        }

        let init = if self.is(";") {
            None
        } else if self.is("final") || self.is_local_variable_declaration() {
            Some(Statement::VariableDeclarations(self.local_variable_declaration()?))
        } else {
            Some(Statement::Expression(self.expression()?))
        };
        let init_after = self.expect(";")?;
        let condition = if self.is(";") {
            None
        } else {
            Some(self.expression()?)
        };
        let condition_after = self.expect(";")?;
        let mut update = Vec::new();
        if !self.is(")") {
            loop {
                let expression = self.expression()?;
                if self.is(",") {
                    let after = self.expect(",")?;
                    update.push(Padded {
                        element: expression,
                        after,
                    });
                } else {
                    update.push(Padded::new(expression));
                    break;
                }
            }
        }
        let end = self.expect(")")?;
        let body = self.block_statement()?;
        Ok(Padded::new(Statement::For(Arc::new(ForLoop {
            id: Id::next(),
            prefix,
            control: ForControl {
                prefix: control_prefix,
                init: Padded {
                    element: init,
                    after: init_after,
                },
                condition: Padded {
                    element: condition,
                    after: condition_after,
                },
                update,
                end,
            },
            body,
        }))))
    }

    fn switch_statement(&mut self) -> PResult<Padded<Statement>> {
        let prefix = self.expect("switch")?;
        let selector = self.control_parentheses()?;
        let body_prefix = self.expect("{")?;
        let mut cases = Vec::new();
        while !self.is("}") {
            if self.at_eof() {
                return Err(self.error("expected '}'"));
            }
            cases.push(self.case()?);
        }
        let end = self.expect("}")?;
        Ok(Padded::new(Statement::Switch(Arc::new(Switch {
            id: Id::next(),
            prefix,
            selector,
            body_prefix,
            cases,
            end,
        }))))
    }

    fn case(&mut self) -> PResult<Arc<Case>> {
        let mut labels = Vec::new();
        let prefix = if self.is("default") {
            self.expect("default")?
        } else if self.is("case") {
            let prefix = self.expect("case")?;
            loop {
                // Not `expression()`: `A ->` would read as a lambda.
                let label = self.ternary()?;
                if self.is(",") {
                    let after = self.expect(",")?;
                    labels.push(Padded { element: label, after });
                } else {
                    labels.push(Padded::new(label));
                    break;
                }
            }
            prefix
        } else {
            return Err(self.error("expected 'case' or 'default'"));
        };
        let (separator, body) = if self.is("->") {
            let separator = self.expect("->")?;
            (separator, CaseBody::Rule(self.block_statement()?))
        } else {
            let separator = self.expect(":")?;
            let mut statements = Vec::new();
            while !(self.is("case") || self.is("default") || self.is("}")) {
                if self.at_eof() {
                    return Err(self.error("expected '}'"));
                }
                statements.push(self.block_statement()?);
            }
            (separator, CaseBody::Statements(statements))
        };
        Ok(Arc::new(Case {
            id: Id::next(),
            prefix,
            labels,
            separator,
            body,
        }))
    }

    fn try_resources(&mut self) -> PResult<TryResources> {
        let prefix = self.expect("(")?;
        let mut resources = Vec::new();
        let mut terminated = false;
        while !self.is(")") {
            let resource = if self.is("final") || self.is("@") || self.is_local_variable_declaration() {
                Statement::VariableDeclarations(self.local_variable_declaration()?)
            } else {
                Statement::Expression(self.expression()?)
            };
            if self.is(";") {
                let after = self.expect(";")?;
                resources.push(Padded { element: resource, after });
                terminated = true;
            } else {
                resources.push(Padded::new(resource));
                terminated = false;
                break;
            }
        }
        if resources.is_empty() {
            return Err(self.error("expected a resource"));
        }
        let end = self.expect(")")?;
        Ok(TryResources {
            prefix,
            resources,
            terminated,
            end,
        })
    }

    fn try_statement(&mut self) -> PResult<Padded<Statement>> {
        let prefix = self.expect("try")?;
        let resources = if self.is("(") {
            Some(self.try_resources()?)
        } else {
            None
        };
        let body = self.block()?;
        let mut catches = Vec::new();
        while self.is("catch") {
            let catch_prefix = self.expect("catch")?;
            let parameter_prefix = self.expect("(")?;
            let (decl_prefix, leading_annotations, modifiers) = self.modifiers()?;
            let type_expr = self.type_tree()?;
            if self.is("|") {
                return Err(self.error("multi-catch is not supported"));
            }
            let variable = self.named_variable(false)?;
            let after = self.expect(")")?;
            let catch_body = self.block()?;
            catches.push(Catch {
                id: Id::next(),
                prefix: catch_prefix,
                parameter_prefix,
                parameter: Padded {
                    element: Arc::new(VariableDeclarations {
                        id: Id::next(),
                        prefix: decl_prefix,
                        leading_annotations,
                        modifiers,
                        type_expr: Some(type_expr),
                        varargs: None,
                        variables: vec![Padded::new(variable)],
                    }),
                    after,
                },
                body: catch_body,
            });
        }
        let finally = if self.is("finally") {
            let before = self.expect("finally")?;
            Some(LeftPadded {
                before,
                element: self.block()?,
            })
        } else {
            None
        };
        if resources.is_none() && catches.is_empty() && finally.is_none() {
            return Err(self.error("expected 'catch' or 'finally'"));
        }
        Ok(Padded::new(Statement::Try(Arc::new(Try {
            id: Id::next(),
            prefix,
            resources,
            body,
            catches,
            finally,
        }))))
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    pub(crate) fn expression(&mut self) -> PResult<Expression> {
        if self.is_lambda_start() {
            return self.lambda();
        }
        let left = self.ternary()?;
        let op = match self.peek().kind {
            TokenKind::Punct => AssignOp::from_symbol(self.peek().text),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(left);
        };
        let before = self.next_token().0;
        let value = self.expression()?;
        let (prefix, variable) = hoist(left);
        Ok(Expression::Assignment(Arc::new(Assignment {
            id: Id::next(),
            prefix,
            variable,
            operator: LeftPadded { before, element: op },
            value,
            ty: JavaType::Unknown,
        })))
    }

    fn is_lambda_start(&self) -> bool {
        if self.is_name_at(0) && self.is_at(1, "->") {
            return true;
        }
        if !self.is("(") {
            return false;
        }
        let mut depth = 0usize;
        let mut n = 0;
        loop {
            let token = self.peek_at(n);
            match token.kind {
                TokenKind::Eof => return false,
                TokenKind::Punct if token.text == "(" => depth += 1,
                TokenKind::Punct if token.text == ")" => {
                    depth -= 1;
                    if depth == 0 {
                        return self.is_at(n + 1, "->");
                    }
                }
                _ => {}
            }
            n += 1;
        }
    }

    fn lambda(&mut self) -> PResult<Expression> {
        let prefix = self.prefix();
        let (parenthesized, parameters) = if self.is("(") {
            (true, self.container("(", ")", |p| p.lambda_parameter())?)
        } else {
            let param = self.lambda_parameter()?;
            (
                false,
                Container {
                    before: Space::EMPTY,
                    elements: vec![Padded::new(param)],
                    end: Space::EMPTY,
                },
            )
        };
        let arrow = self.expect("->")?;
        let body = if self.is("{") {
            LambdaBody::Block(self.block()?)
        } else {
            LambdaBody::Expression(self.expression()?)
        };
        Ok(Expression::Lambda(Arc::new(Lambda {
            id: Id::next(),
            prefix,
            parenthesized,
            parameters,
            arrow,
            body,
            ty: JavaType::Unknown,
        })))
    }

    fn lambda_parameter(&mut self) -> PResult<Arc<VariableDeclarations>> {
        if self.is_name_at(0) && (self.is_at(1, ",") || self.is_at(1, ")") || self.is_at(1, "->")) {
            let prefix = self.prefix();
            let variable = self.named_variable(false)?;
            return Ok(Arc::new(VariableDeclarations {
                id: Id::next(),
                prefix,
                leading_annotations: Vec::new(),
                modifiers: Vec::new(),
                type_expr: None,
                varargs: None,
                variables: vec![Padded::new(variable)],
            }));
        }
        self.formal_parameter()
    }

    fn ternary(&mut self) -> PResult<Expression> {
        let condition = self.binary(1)?;
        if !self.is("?") {
            return Ok(condition);
        }
        let true_before = self.expect("?")?;
        let true_part = self.expression()?;
        let false_before = self.expect(":")?;
        let false_part = if self.is_lambda_start() {
            self.lambda()?
        } else {
            self.ternary()?
        };
        let (prefix, condition) = hoist(condition);
        Ok(Expression::Ternary(Arc::new(Ternary {
            id: Id::next(),
            prefix,
            condition,
            true_part: LeftPadded {
                before: true_before,
                element: true_part,
            },
            false_part: LeftPadded {
                before: false_before,
                element: false_part,
            },
            ty: JavaType::Unknown,
        })))
    }

    /// Operator at the cursor and the number of tokens it spans.
    fn binary_op(&self) -> Option<(BinaryOp, usize)> {
        let token = self.peek();
        if token.kind == TokenKind::Identifier {
            return (token.text == "instanceof").then_some((BinaryOp::InstanceOf, 1));
        }
        if token.kind != TokenKind::Punct {
            return None;
        }
        let joined = |n: usize| self.is_at(n, ">") && self.peek_at(n).prefix.is_empty();
        let op = match token.text {
            "||" => BinaryOp::Or,
            "&&" => BinaryOp::And,
            "|" => BinaryOp::BitOr,
            "^" => BinaryOp::BitXor,
            "&" => BinaryOp::BitAnd,
            "==" => BinaryOp::Equal,
            "!=" => BinaryOp::NotEqual,
            "<" => BinaryOp::LessThan,
            "<=" => BinaryOp::LessThanOrEqual,
            ">" if joined(1) && joined(2) => return Some((BinaryOp::UnsignedShiftRight, 3)),
            ">" if joined(1) => return Some((BinaryOp::ShiftRight, 2)),
            ">" => BinaryOp::GreaterThan,
            ">=" => BinaryOp::GreaterThanOrEqual,
            "<<" => BinaryOp::ShiftLeft,
            "+" => BinaryOp::Addition,
            "-" => BinaryOp::Subtraction,
            "*" => BinaryOp::Multiplication,
            "/" => BinaryOp::Division,
            "%" => BinaryOp::Modulo,
            _ => return None,
        };
        Some((op, 1))
    }

    fn binary(&mut self, min_precedence: u8) -> PResult<Expression> {
        let mut left = self.unary()?;
        while let Some((op, width)) = self.binary_op() {
            if op.precedence() < min_precedence {
                break;
            }
            let before = self.prefix();
            for _ in 0..width {
                self.bump();
            }
            let right = if op == BinaryOp::InstanceOf {
                match self.type_tree()? {
                    TypeTree::Named(name) => name,
                    _ => return Err(self.error("only named types are supported after instanceof")),
                }
            } else {
                self.binary(op.precedence() + 1)?
            };
            let (prefix, l) = hoist(left);
            left = Expression::Binary(Arc::new(Binary {
                id: Id::next(),
                prefix,
                left: l,
                operator: LeftPadded {
                    before,
                    element: op,
                },
                right,
                ty: JavaType::Unknown,
            }));
        }
        Ok(left)
    }

    fn unary(&mut self) -> PResult<Expression> {
        let op = match self.peek().text {
            "!" => Some(UnaryOp::Not),
            "~" => Some(UnaryOp::Complement),
            "-" => Some(UnaryOp::Negative),
            "+" => Some(UnaryOp::Positive),
            "++" => Some(UnaryOp::PreIncrement),
            "--" => Some(UnaryOp::PreDecrement),
            _ => None,
        };
        if let (Some(op), TokenKind::Punct) = (op, self.peek().kind) {
            let prefix = self.next_token().0;
            let expression = self.unary()?;
            return Ok(Expression::Unary(Arc::new(Unary {
                id: Id::next(),
                prefix,
                operator: LeftPadded::new(op),
                expression,
                ty: JavaType::Unknown,
            })));
        }
        if self.is("(") && self.is_cast() {
            let prefix = self.expect("(")?;
            let clazz = self.type_tree()?;
            let after = self.expect(")")?;
            let expression = self.unary()?;
            return Ok(Expression::TypeCast(Arc::new(TypeCast {
                id: Id::next(),
                prefix,
                clazz: Padded {
                    element: clazz,
                    after,
                },
                expression,
                ty: JavaType::Unknown,
            })));
        }
        let primary = self.primary()?;
        self.postfix(primary)
    }

    fn is_cast(&mut self) -> bool {
        let checkpoint = self.checkpoint();
        self.bump();
        let primitive = self.is_primitive();
        let is_cast = self.type_tree().is_ok() && self.is(")") && {
            let next = self.peek_at(1);
            primitive
                || match next.kind {
                    TokenKind::Identifier => next.text != "instanceof",
                    TokenKind::Punct => matches!(next.text, "(" | "!" | "~"),
                    TokenKind::Eof => false,
                    _ => true,
                }
        };
        self.restore(checkpoint);
        is_cast
    }

    fn literal(&mut self) -> PResult<Expression> {
        let (prefix, token) = self.next_token();
        let text = token.text;
        let (path, source) = (self.path, self.source);
        let invalid = || ParseError::at(path, source, token.offset, format!("invalid literal {text}"));
        let value = match token.kind {
            TokenKind::IntLiteral => LiteralValue::Int(parse_integer(text).ok_or_else(|| invalid())?),
            TokenKind::LongLiteral => {
                LiteralValue::Long(parse_integer(&text[..text.len() - 1]).ok_or_else(|| invalid())?)
            }
            TokenKind::FloatLiteral => LiteralValue::Float(
                text[..text.len() - 1]
                    .replace('_', "")
                    .parse()
                    .map_err(|_| invalid())?,
            ),
            TokenKind::DoubleLiteral => LiteralValue::Double(
                text.trim_end_matches(&['d', 'D'][..])
                    .replace('_', "")
                    .parse()
                    .map_err(|_| invalid())?,
            ),
            TokenKind::CharLiteral => LiteralValue::Char(
                unescape(&text[1..text.len() - 1])
                    .chars()
                    .next()
                    .ok_or_else(|| invalid())?,
            ),
            TokenKind::StringLiteral if text.starts_with("\"\"\"") => {
                let body = &text[3..text.len() - 3];
                let body = body.split_once('\n').map_or(body, |(_, rest)| rest);
                LiteralValue::String(unescape(body))
            }
            TokenKind::StringLiteral => LiteralValue::String(unescape(&text[1..text.len() - 1])),
            _ => match text {
                "true" => LiteralValue::Boolean(true),
                "false" => LiteralValue::Boolean(false),
                "null" => LiteralValue::Null,
                _ => return Err(invalid()),
            },
        };
        Ok(Expression::Literal(Arc::new(Literal {
            id: Id::next(),
            prefix,
            value,
            source: text.to_string(),
            ty: JavaType::Unknown,
        })))
    }

    fn arguments(&mut self) -> PResult<Container<Expression>> {
        self.container("(", ")", |p| p.expression())
    }

    fn array_initializer(&mut self, element: impl FnMut(&mut Self) -> PResult<Expression>) -> PResult<Expression> {
        let prefix = self.prefix();
        let initializer = self.container("{", "}", element)?;
        Ok(Expression::NewArray(Arc::new(NewArray {
            id: Id::next(),
            prefix,
            element_type: None,
            dimensions: Vec::new(),
            initializer: Some(initializer),
            ty: JavaType::Unknown,
        })))
    }

    fn primary(&mut self) -> PResult<Expression> {
        let token = *self.peek();
        match token.kind {
            TokenKind::IntLiteral
            | TokenKind::LongLiteral
            | TokenKind::FloatLiteral
            | TokenKind::DoubleLiteral
            | TokenKind::CharLiteral
            | TokenKind::StringLiteral => self.literal(),
            TokenKind::Identifier if matches!(token.text, "true" | "false" | "null") => self.literal(),
            TokenKind::Identifier if matches!(token.text, "this" | "super") => {
                let name = self.word()?;
                if self.is("(") {
                    return Err(self.error("explicit constructor calls are not supported"));
                }
                Ok(Expression::Identifier(name))
            }
            TokenKind::Identifier if token.text == "new" => self.new_expression(),
            TokenKind::Identifier if !is_keyword(token.text) => {
                let mut name = self.ident()?;
                if self.is("(") {
                    let prefix = std::mem::take(&mut Arc::make_mut(&mut name).prefix);
                    let arguments = self.arguments()?;
                    return Ok(Expression::MethodInvocation(Arc::new(MethodInvocation {
                        id: Id::next(),
                        prefix,
                        select: None,
                        name,
                        arguments,
                        method_type: None,
                    })));
                }
                Ok(Expression::Identifier(name))
            }
            TokenKind::Punct if token.text == "(" => {
                let prefix = self.expect("(")?;
                let element = self.expression()?;
                let after = self.expect(")")?;
                Ok(Expression::Parentheses(Arc::new(Parentheses {
                    id: Id::next(),
                    prefix,
                    tree: Padded { element, after },
                })))
            }
            TokenKind::Punct if token.text == "{" => self.array_initializer(|p| p.variable_initializer()),
            _ => Err(self.error("expected expression")),
        }
    }

    fn postfix(&mut self, mut target: Expression) -> PResult<Expression> {
        loop {
            if self.is(".") {
                if self.is_at(1, "new") || self.is_at(1, "<") {
                    return Err(self.error("unsupported member selection"));
                }
                let before = self.expect(".")?;
                let name = self.word()?;
                let keyword_ok = matches!(name.name.as_str(), "class" | "this");
                if is_keyword(&name.name) && !keyword_ok {
                    return Err(self.error("expected identifier after '.'"));
                }
                let (prefix, select) = hoist(target);
                target = if self.is("(") && !keyword_ok {
                    let arguments = self.arguments()?;
                    Expression::MethodInvocation(Arc::new(MethodInvocation {
                        id: Id::next(),
                        prefix,
                        select: Some(Padded {
                            element: select,
                            after: before,
                        }),
                        name,
                        arguments,
                        method_type: None,
                    }))
                } else {
                    Expression::FieldAccess(Arc::new(FieldAccess {
                        id: Id::next(),
                        prefix,
                        target: select,
                        name: LeftPadded {
                            before,
                            element: name,
                        },
                        ty: JavaType::Unknown,
                    }))
                };
            } else if self.is("[") {
                let bracket = self.expect("[")?;
                let index = self.expression()?;
                let after = self.expect("]")?;
                let (prefix, indexed) = hoist(target);
                target = Expression::ArrayAccess(Arc::new(ArrayAccess {
                    id: Id::next(),
                    prefix,
                    indexed,
                    dimension: ArrayDimension {
                        prefix: bracket,
                        index: Padded {
                            element: Some(index),
                            after,
                        },
                    },
                    ty: JavaType::Unknown,
                }));
            } else if self.is("::") {
                let before = self.expect("::")?;
                let reference = self.word()?;
                let (prefix, containing) = hoist(target);
                target = Expression::MemberReference(Arc::new(MemberReference {
                    id: Id::next(),
                    prefix,
                    containing,
                    reference: LeftPadded {
                        before,
                        element: reference,
                    },
                    ty: JavaType::Unknown,
                }));
            } else if self.is("++") || self.is("--") {
                let op = if self.is("++") {
                    UnaryOp::PostIncrement
                } else {
                    UnaryOp::PostDecrement
                };
                let before = self.next_token().0;
                let (prefix, expression) = hoist(target);
                target = Expression::Unary(Arc::new(Unary {
                    id: Id::next(),
                    prefix,
                    operator: LeftPadded { before, element: op },
                    expression,
                    ty: JavaType::Unknown,
                }));
            } else {
                return Ok(target);
            }
        }
    }

    fn new_expression(&mut self) -> PResult<Expression> {
        let prefix = self.expect("new")?;
        let base = self.type_tree_base()?;
        if self.is("[") {
            let mut dimensions = Vec::new();
            while self.is("[") {
                let bracket = self.expect("[")?;
                let index = if self.is("]") {
                    None
                } else {
                    Some(self.expression()?)
                };
                let after = self.expect("]")?;
                dimensions.push(ArrayDimension {
                    prefix: bracket,
                    index: Padded {
                        element: index,
                        after,
                    },
                });
            }
            let initializer = if self.is("{") {
                Some(self.container("{", "}", |p| p.variable_initializer())?)
            } else {
                None
            };
            return Ok(Expression::NewArray(Arc::new(NewArray {
                id: Id::next(),
                prefix,
                element_type: Some(base),
                dimensions,
                initializer,
                ty: JavaType::Unknown,
            })));
        }
        let arguments = self.arguments()?;
        let body = if self.is("{") {
            Some(self.class_body()?)
        } else {
            None
        };
        Ok(Expression::NewClass(Arc::new(NewClass {
            id: Id::next(),
            prefix,
            clazz: base,
            arguments,
            body,
            ty: JavaType::Unknown,
        })))
    }

    // -----------------------------------------------------------------------
    // Types
    // -----------------------------------------------------------------------

    fn type_tree(&mut self) -> PResult<TypeTree> {
        let mut tree = self.type_tree_base()?;
        while self.is("[") && self.is_at(1, "]") {
            let open = self.expect("[")?;
            let close = self.expect("]")?;
            let (prefix, element) = hoist_type(tree);
            tree = TypeTree::Array(Arc::new(ArrayType {
                id: Id::next(),
                prefix,
                element,
                open,
                close,
                ty: JavaType::Unknown,
            }));
        }
        Ok(tree)
    }

    fn type_tree_base(&mut self) -> PResult<TypeTree> {
        if self.is("?") {
            let prefix = self.expect("?")?;
            let (bound, bounded) = if self.is("extends") || self.is("super") {
                let kind = if self.is("extends") {
                    WildcardBound::Extends
                } else {
                    WildcardBound::Super
                };
                let before = self.next_token().0;
                (
                    Some(LeftPadded {
                        before,
                        element: kind,
                    }),
                    Some(self.type_tree()?),
                )
            } else {
                (None, None)
            };
            return Ok(TypeTree::Wildcard(Arc::new(Wildcard {
                id: Id::next(),
                prefix,
                bound,
                bounded,
            })));
        }
        if let Some(primitive) = Primitive::from_keyword(self.peek().text) {
            if self.peek().kind == TokenKind::Identifier {
                let prefix = self.next_token().0;
                return Ok(TypeTree::Primitive(Arc::new(PrimitiveTree {
                    id: Id::next(),
                    prefix,
                    primitive,
                })));
            }
        }
        let name = self.qualified_name()?;
        if !self.is("<") {
            return Ok(TypeTree::Named(name));
        }
        let (prefix, clazz) = hoist(name);
        let type_arguments = self.container("<", ">", |p| p.type_tree())?;
        Ok(TypeTree::Parameterized(Arc::new(ParameterizedType {
            id: Id::next(),
            prefix,
            clazz,
            type_arguments,
            ty: JavaType::Unknown,
        })))
    }
}

fn parse_integer(text: &str) -> Option<i64> {
    let digits = text.replace('_', "");
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok();
    }
    if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        return i64::from_str_radix(bin, 2).ok();
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return i64::from_str_radix(&digits[1..], 8).ok();
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> CompilationUnit {
        parse_compilation_unit(Path::new("T.java"), source).unwrap()
    }

    fn roundtrip(source: &str) {
        assert_eq!(parse(source).print(), source);
    }

    #[test]
    fn prints_test_class_byte_for_byte() {
        roundtrip(
            r#"package org.example;

import static org.junit.jupiter.api.Assertions.assertEquals;

import java.util.List;
import org.junit.jupiter.api.*;

/** Docs. */
@DisplayName("sample")
public class SampleTest extends Base implements Runnable, java.io.Serializable {
    private static final double DELTA = 0.01; // trailing
    private final List<String> names = new java.util.ArrayList<>();

    @Test
    void adds ( ) throws Exception {
        int n = 1 + 2 * 3;
        assertEquals( 7 , n, () -> "sum " + n );
        if (n > 3) { n++; } else n--;
        for (String name : names) System.out.println(name);
        for (int i = 0; i < n; i++) { }
        while (!names.isEmpty()) names.remove(0);
        try { run(); } catch (IllegalStateException e) { throw e; } finally { }
        double[] values = {1.0, 2.0};
        Object o = (Object) values;
        String s = n > 1 ? "a" : "b";
        names.forEach(System.out::println);
        ;
    }

    public void run() {}
}
"#,
        );
    }

    #[test]
    fn prints_switch_and_loop_statements_byte_for_byte() {
        roundtrip(
            r#"class A {
    int m(String s, int n) {
        switch (s) {
            case "a" :
            case "b":
                n++;
                break;
            case "c", "d": {
                return n;
            }
            // fallback
            default:
                n = 0;
        }
        switch (n) {
            case 1 -> s.trim();
            case 2, 3 -> { n--; }
            default -> throw new IllegalStateException();
        }
        do { n--; if (n == 2) continue; } while (n > 0) ;
        return n;
    }
}
"#,
        );
    }

    #[test]
    fn switch_cases_keep_labels_and_bodies() {
        let cu = parse("class A { void m(int n) { switch (n) { case 1, 2: n++; break; default -> n = 0; } } }");
        let Statement::Method(method) = &cu.classes[0].body.statements[0].element else {
            panic!("expected method");
        };
        let Statement::Switch(switch) = &method.body.as_ref().unwrap().statements[0].element else {
            panic!("expected switch");
        };
        assert_eq!(switch.cases.len(), 2);
        assert_eq!(switch.cases[0].labels.len(), 2);
        let CaseBody::Statements(statements) = &switch.cases[0].body else {
            panic!("expected statement group");
        };
        assert!(matches!(statements[1].element, Statement::Break(_)));
        assert!(switch.cases[1].is_default());
        assert!(matches!(switch.cases[1].body, CaseBody::Rule(_)));
    }

    #[test]
    fn prints_try_with_resources_byte_for_byte() {
        roundtrip("class A { void m() { try (Reader r = open() ; Writer w = r.writer();) { w.flush(); } } }\n");
        roundtrip("class A { void m() { try ( final Reader r = open() ) { r.read(); } catch (Exception e) { } } }\n");
        roundtrip("class A { void m(Reader r) { try (r; Reader s = r.copy()) { } finally { } } }\n");
    }

    #[test]
    fn try_resources_are_declarations_or_expressions() {
        let cu = parse("class A { void m(Reader in) { try (in; Reader r = open()) { } } }");
        let Statement::Method(method) = &cu.classes[0].body.statements[0].element else {
            panic!("expected method");
        };
        let Statement::Try(t) = &method.body.as_ref().unwrap().statements[0].element else {
            panic!("expected try");
        };
        let resources = t.resources.as_ref().unwrap();
        assert!(!resources.terminated);
        assert!(matches!(resources.resources[0].element, Statement::Expression(Expression::Identifier(_))));
        assert!(matches!(resources.resources[1].element, Statement::VariableDeclarations(_)));
        assert!(t.catches.is_empty() && t.finally.is_none());
    }

    #[test]
    fn keeps_trivia_after_last_token() {
        roundtrip("class A {}\n\n// end\n");
    }

    #[test]
    fn outer_node_owns_the_prefix() {
        let cu = parse("class A { void m() {\n    a.b(c);\n} }");
        let Statement::Method(method) = &cu.classes[0].body.statements[0].element else {
            panic!("expected method");
        };
        let Statement::Expression(Expression::MethodInvocation(mi)) =
            &method.body.as_ref().unwrap().statements[0].element
        else {
            panic!("expected invocation");
        };
        assert_eq!(mi.prefix.as_str(), "\n    ");
        assert!(mi.select.as_ref().unwrap().element.prefix().is_empty());
        assert_eq!(mi.simple_name(), "b");
    }

    #[test]
    fn shift_operators_join_split_angles() {
        let cu = parse("class A { int x = 8 >> 1; List<List<String>> y; }");
        let Statement::VariableDeclarations(decls) = &cu.classes[0].body.statements[0].element else {
            panic!("expected field");
        };
        let init = decls.variables[0].element.initializer.as_ref().unwrap();
        let Expression::Binary(binary) = &init.element else {
            panic!("expected binary");
        };
        assert_eq!(binary.operator.element, BinaryOp::ShiftRight);
        roundtrip("class A { int x = 8 >> 1; List<List<String>> y; }");
    }

    #[test]
    fn import_shapes() {
        let cu = parse("import static org.mockito.Mockito.*;\nimport java.util.*;\nimport java.util.List;\nclass A {}");
        assert!(cu.imports[0].element.is_static());
        assert!(cu.imports[0].element.is_wildcard());
        assert_eq!(cu.imports[0].element.type_name().as_deref(), Some("org.mockito.Mockito"));
        assert_eq!(cu.imports[1].element.type_name(), None);
        assert_eq!(cu.imports[1].element.package_name(), "java.util");
        assert_eq!(cu.imports[2].element.name(), "java.util.List");
    }

    #[test]
    fn string_literal_values_are_unescaped() {
        let cu = parse("class A { String s = \"a\\tb\"; String e = \"\"; }");
        let values: Vec<_> = cu.classes[0]
            .body
            .statements
            .iter()
            .filter_map(|s| match &s.element {
                Statement::VariableDeclarations(d) => d.variables[0].element.initializer.clone(),
                _ => None,
            })
            .map(|init| match init.element {
                Expression::Literal(l) => l.value.clone(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(values, vec![LiteralValue::String("a\tb".into()), LiteralValue::String(String::new())]);
    }

    #[test]
    fn reports_position_of_syntax_errors() {
        let err = parse_compilation_unit(Path::new("T.java"), "class A {\n  void m() { int = 1; }\n}").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("expected"));
    }
}
