//! Built-in defaults used when neither the rules file nor the CLI says otherwise.

/// Source extensions scanned by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx"];

/// Directory names (or globs) never descended into by default.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "node_modules",
    "dist",
    "build",
    ".next",
    "coverage",
    "backups",
    "*.backup*",
    "*_backup*",
];

/// Directories skipped no matter what the configuration says.
pub const ALWAYS_SKIP_DIRS: &[&str] = &[".git", ".svn", ".hg"];

pub const DEFAULT_BACKUP_DIR: &str = "backups";

pub const DEFAULT_VERIFY_TIMEOUT_SECS: u64 = 120;

/// Language, platform and framework names a rename rule must never touch.
pub const DEFAULT_PROTECTED: &[&str] = &[
    // Number / String / Array / Object
    "toFixed",
    "toPrecision",
    "toString",
    "toLocaleString",
    "valueOf",
    "parseInt",
    "parseFloat",
    "isNaN",
    "toLowerCase",
    "toUpperCase",
    "localeCompare",
    "startsWith",
    "endsWith",
    "padStart",
    "padEnd",
    "trimStart",
    "trimEnd",
    "replaceAll",
    "charAt",
    "charCodeAt",
    "indexOf",
    "lastIndexOf",
    "forEach",
    "flatMap",
    "findIndex",
    "findLast",
    "fromEntries",
    "hasOwnProperty",
    "defineProperty",
    "getOwnPropertyNames",
    "isArray",
    // Date
    "toISOString",
    "toDateString",
    "toTimeString",
    "toLocaleDateString",
    "toLocaleTimeString",
    "toUTCString",
    "getTime",
    "getFullYear",
    "getMonth",
    "getDate",
    "getDay",
    "getHours",
    "getMinutes",
    "getSeconds",
    "setFullYear",
    "setMonth",
    "setDate",
    "setHours",
    // JSON / Promise / timers
    "JSON",
    "stringify",
    "allSettled",
    "setTimeout",
    "clearTimeout",
    "setInterval",
    "clearInterval",
    "requestAnimationFrame",
    // DOM
    "addEventListener",
    "removeEventListener",
    "preventDefault",
    "stopPropagation",
    "getElementById",
    "querySelector",
    "querySelectorAll",
    "createElement",
    "appendChild",
    "classList",
    "innerHTML",
    "textContent",
    "localStorage",
    "sessionStorage",
    "getItem",
    "setItem",
    "removeItem",
    "encodeURIComponent",
    "decodeURIComponent",
    // React
    "useState",
    "useEffect",
    "useMemo",
    "useCallback",
    "useRef",
    "useContext",
    "useReducer",
    "useLayoutEffect",
    "forwardRef",
    "createContext",
    "className",
    "htmlFor",
    "onClick",
    "onChange",
    "onSubmit",
    "onBlur",
    "onFocus",
    "onKeyDown",
    "dangerouslySetInnerHTML",
    "defaultValue",
    "key",
    // Next.js
    "useRouter",
    "usePathname",
    "useSearchParams",
    "getServerSideProps",
    "getStaticProps",
    "NextResponse",
    "NextRequest",
    // Prisma client
    "findUnique",
    "findUniqueOrThrow",
    "findFirst",
    "findMany",
    "createMany",
    "updateMany",
    "deleteMany",
    "upsert",
    "aggregate",
    "groupBy",
    "orderBy",
    "$transaction",
    "$queryRaw",
    "$executeRaw",
    "$disconnect",
    "_count",
    "_sum",
];

pub fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

pub fn default_excludes() -> Vec<String> {
    DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect()
}
