//! Symbols, scopes and TypeScript namespace member tables.
//!
//! Symbols live in an arena and are addressed by [`Ref`]. When two
//! declarations merge, the older symbol is linked to the newer one; the
//! canonical symbol is found by following links until a symbol has none.
//!
//! Namespace and enum blocks that merge share one exported-members table.
//! The tables live in [`NamespaceTables`] and are addressed by
//! [`MembersId`], so "the same table" is just "the same id".

use rustc_hash::FxHashMap;

/// Index of a symbol in the [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ref(u32);

impl Ref {
    /// Placeholder for a binding that was parsed but not declared, such as
    /// the names in `declare let x`.
    pub const INVALID: Ref = Ref(u32::MAX);

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_valid(self) -> bool {
        self != Ref::INVALID
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// A reference to a name nobody declared.
    Unbound,
    /// `var` declarations and namespace closure parameters.
    Hoisted,
    HoistedFunction,
    GeneratorOrAsyncFunction,
    Arguments,
    CatchIdentifier,
    Class,
    Const,
    Import,
    /// `let`, parameters, enum values and anything else.
    Other,
    TSEnum,
    TSNamespace,
}

impl SymbolKind {
    pub fn is_hoisted_or_function(self) -> bool {
        matches!(
            self,
            SymbolKind::Hoisted | SymbolKind::HoistedFunction | SymbolKind::GeneratorOrAsyncFunction
        )
    }

    pub fn is_function(self) -> bool {
        matches!(
            self,
            SymbolKind::HoistedFunction | SymbolKind::GeneratorOrAsyncFunction
        )
    }
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Set when this symbol was merged into a later declaration.
    pub link: Option<Ref>,
    /// Number of resolved references, counted by the lowering pass.
    pub use_count: u32,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: SymbolKind, name: impl Into<String>) -> Ref {
        let r = Ref(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            name: name.into(),
            kind,
            link: None,
            use_count: 0,
        });
        r
    }

    pub fn get(&self, r: Ref) -> &Symbol {
        &self.symbols[r.index()]
    }

    pub fn get_mut(&mut self, r: Ref) -> &mut Symbol {
        &mut self.symbols[r.index()]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Follow merge links to the symbol that represents all merged
    /// declarations.
    pub fn canonical(&self, mut r: Ref) -> Ref {
        while let Some(next) = self.symbols[r.index()].link {
            r = next;
        }
        r
    }

    pub fn record_use(&mut self, r: Ref) {
        let r = self.canonical(r);
        self.symbols[r.index()].use_count += 1;
    }
}

/// Index of a scope in the [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Module, namespace or enum body.
    Entry,
    Block,
    FunctionArgs,
    FunctionBody,
    ClassBody,
    CatchBinding,
    With,
}

impl ScopeKind {
    /// Scopes where `var` declarations stop.
    pub fn stops_hoisting(self) -> bool {
        matches!(
            self,
            ScopeKind::Entry | ScopeKind::FunctionArgs | ScopeKind::FunctionBody
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeMember {
    pub symbol: Ref,
    /// Byte offset of the declaring identifier.
    pub loc: u32,
}

#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub members: FxHashMap<String, ScopeMember>,
    /// Present on namespace and enum body scopes.
    pub ts_namespace: Option<NamespaceScope>,
    /// Symbols created without a name in `members` (renamed closure args).
    pub generated: Vec<Ref>,
    /// Scopes opened by a construct that was later thrown away.
    pub discarded: bool,
}

#[derive(Debug, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            kind,
            parent,
            members: FxHashMap::default(),
            ts_namespace: None,
            generated: Vec::new(),
            discarded: false,
        });
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Mark every scope created at or after `mark` as discarded.
    pub fn discard_from(&mut self, mark: usize) {
        let len = self.scopes.len();
        for scope in &mut self.scopes[mark.min(len)..] {
            scope.discarded = true;
        }
    }

    /// Move the scopes created at or after `mark` whose parent is `from`
    /// under `to`. Used when a parenthesized expression turns out to be
    /// an arrow function's parameter list.
    pub fn reparent_from(&mut self, mark: usize, from: ScopeId, to: ScopeId) {
        for (i, scope) in self.scopes.iter_mut().enumerate().skip(mark) {
            if i != to.index() && scope.parent == Some(from) {
                scope.parent = Some(to);
            }
        }
    }

    /// The nearest enclosing namespace or enum scope's data.
    pub fn enclosing_namespace(&self, mut id: ScopeId) -> Option<&NamespaceScope> {
        loop {
            let scope = self.get(id);
            if let Some(ns) = &scope.ts_namespace {
                return Some(ns);
            }
            id = scope.parent?;
        }
    }
}

// =============================================================================
// Namespace tables
// =============================================================================

/// Index of a shared exported-members table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MembersId(u32);

/// What is known about a namespace member.
#[derive(Debug, Clone, PartialEq)]
pub enum NamespaceMemberData {
    /// An exported variable, function or class. Reads become property
    /// accesses on the namespace object.
    Property,
    /// A nested namespace or enum and its own member table.
    Namespace(MembersId),
    /// An enum member whose value folded to a number.
    EnumNumber(f64),
    /// An enum member whose value folded to a string.
    EnumString(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceMember {
    pub loc: u32,
    pub data: NamespaceMemberData,
    pub is_enum_value: bool,
}

/// Attached to the body scope of a namespace or enum.
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceScope {
    pub exported_members: MembersId,
    /// The closure parameter, assigned once the body has been parsed.
    pub arg: Option<Ref>,
    pub is_enum_scope: bool,
}

#[derive(Debug, Default)]
pub struct NamespaceTables {
    tables: Vec<FxHashMap<String, NamespaceMember>>,
    /// Member data for symbols that name namespaces, enums, enum values
    /// and exported namespace members.
    ref_to_member_data: FxHashMap<Ref, NamespaceMemberData>,
}

impl NamespaceTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self) -> MembersId {
        let id = MembersId(self.tables.len() as u32);
        self.tables.push(FxHashMap::default());
        id
    }

    pub fn members(&self, id: MembersId) -> &FxHashMap<String, NamespaceMember> {
        &self.tables[id.0 as usize]
    }

    pub fn members_mut(&mut self, id: MembersId) -> &mut FxHashMap<String, NamespaceMember> {
        &mut self.tables[id.0 as usize]
    }

    pub fn member_data(&self, r: Ref) -> Option<&NamespaceMemberData> {
        self.ref_to_member_data.get(&r)
    }

    pub fn set_member_data(&mut self, r: Ref, data: NamespaceMemberData) {
        self.ref_to_member_data.insert(r, data);
    }

    /// The members table of the namespace or enum named by `r`.
    pub fn namespace_members(&self, r: Ref) -> Option<MembersId> {
        match self.ref_to_member_data.get(&r) {
            Some(NamespaceMemberData::Namespace(id)) => Some(*id),
            _ => None,
        }
    }
}

// =============================================================================
// Declaration merging
// =============================================================================

/// How a new declaration interacts with an existing one of the same name in
/// the same scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeResult {
    Forbidden,
    /// The new declaration reuses the existing symbol.
    KeepExisting,
    /// The existing symbol is linked to the new one.
    ReplaceWithNew,
    /// The new symbol shadows the existing one without linking.
    OverwriteWithNew,
}

/// Decide how two same-named declarations in `scope_kind` merge.
pub fn can_merge_symbols(
    scope_kind: ScopeKind,
    existing: SymbolKind,
    new: SymbolKind,
    is_typescript: bool,
) -> MergeResult {
    use SymbolKind::*;

    if existing == Unbound {
        return MergeResult::ReplaceWithNew;
    }

    // Imports may be type-only, so TypeScript lets them collide
    if is_typescript && existing == Import {
        return MergeResult::ReplaceWithNew;
    }

    // "enum Foo {} enum Foo {}"
    if new == TSEnum && existing == TSEnum {
        return MergeResult::KeepExisting;
    }

    // "namespace Foo { ... } enum Foo {}"
    if new == TSEnum && existing == TSNamespace {
        return MergeResult::ReplaceWithNew;
    }

    // "namespace Foo { ... } namespace Foo { ... }"
    // "function Foo() {} namespace Foo { ... }"
    // "enum Foo {} namespace Foo { ... }"
    if new == TSNamespace
        && matches!(
            existing,
            TSNamespace | HoistedFunction | GeneratorOrAsyncFunction | TSEnum | Class
        )
    {
        return MergeResult::KeepExisting;
    }

    // "var foo; var foo;"
    // "var foo; function foo() {}"
    // "function foo() {} var foo;"
    if new.is_hoisted_or_function()
        && existing.is_hoisted_or_function()
        && (matches!(
            scope_kind,
            ScopeKind::Entry | ScopeKind::FunctionBody | ScopeKind::FunctionArgs
        ) || (new == existing && new == Hoisted))
    {
        return MergeResult::ReplaceWithNew;
    }

    // "try {} catch (e) { var e }"
    if existing == CatchIdentifier && new == Hoisted {
        return MergeResult::ReplaceWithNew;
    }

    // "function() { var arguments }"
    if existing == Arguments && new == Hoisted {
        return MergeResult::KeepExisting;
    }

    // "function() { let arguments }"
    if existing == Arguments {
        return MergeResult::OverwriteWithNew;
    }

    MergeResult::Forbidden
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_follows_links() {
        let mut symbols = SymbolTable::new();
        let a = symbols.add(SymbolKind::TSNamespace, "Foo");
        let b = symbols.add(SymbolKind::TSEnum, "Foo");
        let c = symbols.add(SymbolKind::Other, "Bar");
        symbols.get_mut(a).link = Some(b);

        assert_eq!(symbols.canonical(a), b);
        assert_eq!(symbols.canonical(b), b);
        assert_eq!(symbols.canonical(c), c);

        symbols.record_use(a);
        assert_eq!(symbols.get(b).use_count, 1);
    }

    #[test]
    fn test_merge_rules() {
        use SymbolKind::*;
        let ts = true;
        let entry = ScopeKind::Entry;

        assert_eq!(can_merge_symbols(entry, HoistedFunction, TSNamespace, ts), MergeResult::KeepExisting);
        assert_eq!(can_merge_symbols(entry, Class, TSNamespace, ts), MergeResult::KeepExisting);
        assert_eq!(can_merge_symbols(entry, TSNamespace, TSEnum, ts), MergeResult::ReplaceWithNew);
        assert_eq!(can_merge_symbols(entry, TSEnum, TSEnum, ts), MergeResult::KeepExisting);
        assert_eq!(can_merge_symbols(entry, Other, TSNamespace, ts), MergeResult::Forbidden);
        assert_eq!(can_merge_symbols(entry, Hoisted, TSNamespace, ts), MergeResult::Forbidden);
        assert_eq!(can_merge_symbols(entry, Import, Class, ts), MergeResult::ReplaceWithNew);
        assert_eq!(can_merge_symbols(entry, Import, Class, false), MergeResult::Forbidden);
        assert_eq!(can_merge_symbols(entry, Hoisted, HoistedFunction, ts), MergeResult::ReplaceWithNew);
        assert_eq!(
            can_merge_symbols(ScopeKind::Block, HoistedFunction, HoistedFunction, ts),
            MergeResult::Forbidden
        );
        assert_eq!(can_merge_symbols(ScopeKind::Block, Hoisted, Hoisted, ts), MergeResult::ReplaceWithNew);
    }

    #[test]
    fn test_shared_member_tables() {
        let mut tables = NamespaceTables::new();
        let mut symbols = SymbolTable::new();
        let first = symbols.add(SymbolKind::TSNamespace, "N");
        let id = tables.create();
        tables.set_member_data(first, NamespaceMemberData::Namespace(id));

        // A second block finds the same table through the first symbol
        let shared = tables.namespace_members(first).unwrap();
        tables.members_mut(shared).insert(
            "x".into(),
            NamespaceMember {
                loc: 0,
                data: NamespaceMemberData::Property,
                is_enum_value: false,
            },
        );
        assert!(tables.members(id).contains_key("x"));
    }

    #[test]
    fn test_scope_reparent_and_discard() {
        let mut scopes = ScopeTree::new();
        let module = scopes.push(ScopeKind::Entry, None);
        let mark = scopes.len();
        let inner = scopes.push(ScopeKind::FunctionArgs, Some(module));
        let args = scopes.push(ScopeKind::FunctionArgs, Some(module));
        scopes.reparent_from(mark, module, args);
        assert_eq!(scopes.get(inner).parent, Some(args));
        assert_eq!(scopes.get(args).parent, Some(module));

        scopes.discard_from(mark);
        assert!(scopes.get(inner).discarded);
        assert!(!scopes.get(module).discarded);
    }
}
