#![allow(dead_code)]

use ctxpack::{ContextEngine, EngineConfig, MemorySource, Paths};
use std::path::Path;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A small python service: an entry point, two modules it imports, a test and
/// an unrelated design note.
pub fn sample_repo() -> MemorySource {
    MemorySource::new("/repo")
        .with_file(
            "app/main.py",
            "from app.auth import login\nfrom app.billing import charge_invoice\n\n\
             def main():\n    session = login(read_user(), read_password())\n    \
             charge_invoice(session)\n",
        )
        .with_file(
            "app/auth.py",
            "from app.crypto import verify_password\n\n\
             def login(user, password):\n    if not verify_password(user, password):\n        \
             raise LoginError(user)\n    return Session(user)\n",
        )
        .with_file(
            "app/crypto.py",
            "import hashlib\n\n\
             def verify_password(user, password):\n    \
             return hashlib.sha256(password.encode()).hexdigest() == stored_hash(user)\n",
        )
        .with_file(
            "app/billing.py",
            "def charge_invoice(session):\n    invoice = open_invoice(session.user)\n    \
             send_payment(invoice.total)\n",
        )
        .with_file(
            "tests/test_auth.py",
            "from app.auth import login\n\n\
             def test_login_rejects_bad_password():\n    assert_raises(login, 'u', 'bad')\n",
        )
        .with_file("docs/design.md", &design_note())
}

/// A second, unrelated project
pub fn other_repo() -> MemorySource {
    MemorySource::new("/other")
        .with_file(
            "lib/a.py",
            "from lib.b import render\n\ndef report(rows):\n    return render(rows)\n",
        )
        .with_file(
            "lib/b.py",
            "def render(rows):\n    return '\\n'.join(str(r) for r in rows)\n",
        )
}

/// Long enough that it never fits a tight budget in full
pub fn design_note() -> String {
    let mut note = String::from("# Design\n\n");
    for i in 0..40 {
        note.push_str(&format!(
            "Section {i} describes how the reporting pipeline aggregates monthly figures.\n"
        ));
    }
    note
}

pub fn engine() -> ContextEngine {
    init_tracing();
    ContextEngine::new(EngineConfig::default())
}

pub fn persistent_engine(base: &Path) -> ContextEngine {
    init_tracing();
    ContextEngine::with_paths(EngineConfig::default(), Paths::with_base(base))
}

pub fn indexed_engine() -> ContextEngine {
    let engine = engine();
    engine.index(&sample_repo()).unwrap();
    engine
}
