//! SQLite schema for the local sheet-store backend
//!
//! Mirrors the two-table sheet layout column for column. `pos` preserves
//! sheet row order so targeted cell updates can address rows by position.

pub const SCHEMA: &str = r#"
-- ============================================
-- COMPANIES
-- ============================================

-- [Company Name, Company ID, Role]
-- Role is retained for backward compatibility; current matching ignores it.
CREATE TABLE IF NOT EXISTS companies (
    pos INTEGER PRIMARY KEY AUTOINCREMENT,
    company_name TEXT NOT NULL,
    company_id TEXT NOT NULL UNIQUE,
    role TEXT DEFAULT ''
);

-- ============================================
-- APPLICATIONS
-- ============================================

-- [Status, Company, Date Applied, Last Updated, Link, Role, Company ID, Job ID]
CREATE TABLE IF NOT EXISTS applications (
    pos INTEGER PRIMARY KEY AUTOINCREMENT,
    status TEXT NOT NULL,
    company TEXT NOT NULL,
    date_applied TEXT DEFAULT '',
    last_updated TEXT DEFAULT '',
    link TEXT DEFAULT '',
    role TEXT DEFAULT '',
    company_id TEXT NOT NULL,
    job_id TEXT DEFAULT ''
);

-- ============================================
-- INDEXES
-- ============================================

CREATE INDEX IF NOT EXISTS idx_companies_id ON companies(company_id);
CREATE INDEX IF NOT EXISTS idx_applications_company ON applications(company_id);
CREATE INDEX IF NOT EXISTS idx_applications_job ON applications(company_id, job_id);
"#;
