//! 游戏点券商城 CLI 工具

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use currency_hub_core::catalog::{format_peso, packages_for, price_display};
use currency_hub_core::media::data_url_from_file;
use currency_hub_core::transactions::{
    format_order_number, format_transaction_date, status_badge, OrderTotals,
};
use currency_hub_core::{
    AccessDecision, AccessGate, AdminConsole, ApiClient, Catalog, CatalogQuery, CategoryFilter,
    ClientConfig, DisplayCache, FileStore, GameForm, LoginRequest, NewPromo, NewsDraft,
    PaymentMethod, PriceOption, PurchaseFlow, Session, SessionStore, SignupRequest, StorageConfig,
    UserDetails,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "currency-hub")]
#[command(about = "游戏点券商城客户端工具", long_about = None)]
struct Cli {
    /// 接口地址
    #[arg(short, long, default_value = "http://localhost:5000/api")]
    server: String,

    /// 本地数据目录（会话与展示缓存）
    #[arg(long, default_value = ".currency-hub")]
    data_dir: PathBuf,

    /// 请求超时（秒）
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// 不验证 TLS 证书
    #[arg(long)]
    insecure: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 健康检查
    Health,
    /// 用户注册
    Signup {
        /// 用户名
        #[arg(short, long)]
        username: String,
        /// 邮箱
        #[arg(short, long)]
        email: String,
        /// 密码
        #[arg(short, long)]
        password: String,
    },
    /// 用户登录
    Login {
        /// 用户名或邮箱
        #[arg(short, long)]
        username: String,
        /// 密码
        #[arg(short, long)]
        password: String,
        /// 记住我
        #[arg(long)]
        remember: bool,
    },
    /// 用户登出
    Logout,
    /// 查看当前会话
    Whoami,
    /// 浏览商品
    Games {
        /// 分类（默认 all）
        #[arg(short, long, default_value = "all")]
        category: String,
        /// 搜索关键字
        #[arg(long)]
        search: Option<String>,
    },
    /// 查看商品详情与套餐
    Game {
        /// 商品 ID
        id: i64,
    },
    /// 首页轮播图
    Promos,
    /// 新闻动态
    News,
    /// 购买点券
    Buy {
        /// 商品 ID
        game_id: i64,
        /// 套餐编号（从 1 开始）
        #[arg(long)]
        package: u32,
        /// 支付方式：gcash / paypal / card / bank
        #[arg(long)]
        payment: String,
        /// 游戏内用户 ID
        #[arg(long)]
        user_id: String,
        /// 游戏服务器
        #[arg(long)]
        game_server: Option<String>,
        /// 接收通知的邮箱
        #[arg(long)]
        email: String,
    },
    /// 我的订单
    Orders,
    /// 管理后台
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// 商品列表
    Games,
    /// 新增商品
    AddGame {
        #[arg(long)]
        name: String,
        /// 分类，如 MOBA、RPG
        #[arg(long)]
        category: String,
        #[arg(long)]
        description: String,
        /// 货币名称，如 Diamonds
        #[arg(long)]
        currency: String,
        /// 商品图片文件
        #[arg(long)]
        image: PathBuf,
        /// 货币图标文件
        #[arg(long)]
        icon: PathBuf,
        /// 套餐，格式 `数量:价格`，可重复
        #[arg(long = "option", value_parser = parse_price_option)]
        options: Vec<PriceOption>,
    },
    /// 删除商品
    DeleteGame { id: i64 },
    /// 轮播图列表
    Promos,
    /// 新增轮播图
    AddPromo {
        /// 图片文件
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// 删除轮播图
    DeletePromo { id: i64 },
    /// 新闻列表
    News,
    /// 新增新闻
    AddNews {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        icon: String,
    },
    /// 修改新闻
    UpdateNews {
        id: i64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        icon: String,
    },
    /// 删除新闻
    DeleteNews { id: i64 },
    /// 交易看板
    Transactions,
}

fn parse_price_option(value: &str) -> Result<PriceOption, String> {
    let (amount, price) = value
        .split_once(':')
        .ok_or_else(|| format!("expected AMOUNT:PRICE, got {}", value))?;
    Ok(PriceOption {
        amount: amount.trim().parse().map_err(|e| format!("invalid amount: {}", e))?,
        price: price.trim().parse().map_err(|e| format!("invalid price: {}", e))?,
    })
}

/// 一次命令执行所需的客户端与本地存储
struct Context {
    api: ApiClient,
    store: FileStore,
}

impl Context {
    fn sessions(&self) -> SessionStore<&FileStore> {
        SessionStore::new(&self.store)
    }

    fn cache(&self) -> DisplayCache<&FileStore> {
        DisplayCache::new(&self.store)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    let config = ClientConfig {
        base_url: cli.server.trim_end_matches('/').to_string(),
        timeout: cli.timeout,
        verify_tls: !cli.insecure,
    };
    let ctx = Context {
        api: ApiClient::new(&config)?,
        store: FileStore::open(&StorageConfig {
            data_dir: cli.data_dir.clone(),
        })?,
    };

    match cli.command {
        Commands::Health => do_health(&ctx).await?,
        Commands::Signup { username, email, password } => {
            do_signup(&ctx, username, email, password).await?;
        }
        Commands::Login { username, password, remember } => {
            do_login(&ctx, username, password, remember).await?;
        }
        Commands::Logout => do_logout(&ctx)?,
        Commands::Whoami => do_whoami(&ctx)?,
        Commands::Games { category, search } => do_games(&ctx, &category, search).await?,
        Commands::Game { id } => do_game(&ctx, id).await?,
        Commands::Promos => do_promos(&ctx).await?,
        Commands::News => do_news(&ctx).await?,
        Commands::Buy {
            game_id,
            package,
            payment,
            user_id,
            game_server,
            email,
        } => {
            let details = UserDetails::new(&user_id, game_server.as_deref(), &email);
            do_buy(&ctx, game_id, package, &payment, details).await?;
        }
        Commands::Orders => do_orders(&ctx).await?,
        Commands::Admin { command } => do_admin(&ctx, command).await?,
    }

    Ok(())
}

async fn do_health(ctx: &Context) -> anyhow::Result<()> {
    let health = ctx.api.health().await?;

    if health.is_healthy() {
        println!("服务器状态: 正常");
    } else {
        println!("服务器状态: 异常 ({})", health.status);
    }
    if let Some(message) = health.message {
        println!("{}", message);
    }

    Ok(())
}

async fn do_signup(ctx: &Context, username: String, email: String, password: String) -> anyhow::Result<()> {
    println!("正在注册用户: {}", username);

    let user = ctx
        .api
        .signup(&SignupRequest {
            username,
            email,
            password,
        })
        .await?;
    let session = ctx.sessions().create_session(&user, false)?;

    println!("注册成功!");
    println!("欢迎, {} ({})", session.username, session.role);

    Ok(())
}

async fn do_login(ctx: &Context, username: String, password: String, remember: bool) -> anyhow::Result<()> {
    println!("正在登录用户: {}", username);

    let user = ctx
        .api
        .login(&LoginRequest {
            username_or_email: username,
            password,
        })
        .await?;
    let session = ctx.sessions().create_session(&user, remember)?;

    println!("登录成功!");
    println!("欢迎回来, {} ({})", session.username, session.role);
    println!("会话已保存到 {}", ctx.store.dir().display());

    Ok(())
}

fn do_logout(ctx: &Context) -> anyhow::Result<()> {
    ctx.sessions().logout()?;
    println!("登出成功!");
    Ok(())
}

fn do_whoami(ctx: &Context) -> anyhow::Result<()> {
    match ctx.sessions().current_session()? {
        Some(session) => {
            println!("用户: {} <{}>", session.username, session.email);
            println!("用户ID: {}", session.user_id);
            println!("角色: {}", session.role);
            println!("登录时间: {}", session.login_time.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        None => println!("未登录"),
    }
    Ok(())
}

async fn do_games(ctx: &Context, category: &str, search: Option<String>) -> anyhow::Result<()> {
    let cache = ctx.cache();
    let catalog = Catalog::new(&ctx.api, &cache);
    let query = CatalogQuery {
        category: CategoryFilter::parse(category),
        search,
    };
    let page = catalog.browse(&query).await;

    if let Some(error) = &page.stale {
        eprintln!("{}（显示本地缓存）", error);
    }
    if page.items.is_empty() {
        println!("No games found");
        return Ok(());
    }

    for item in &page.items {
        println!(
            "[{}] {} - {} - {}",
            item.id,
            item.name,
            item.display_category(),
            price_display(item)
        );
    }
    println!("共 {} 个商品", page.items.len());

    Ok(())
}

async fn do_game(ctx: &Context, id: i64) -> anyhow::Result<()> {
    let cache = ctx.cache();
    let item = Catalog::new(&ctx.api, &cache)
        .find(id)
        .await?
        .ok_or_else(|| anyhow!("Item not found"))?;

    println!("{} ({})", item.name, item.display_category());
    println!("{}", item.description_or_default());
    println!("价格: {}", price_display(&item));
    println!("套餐:");
    for package in packages_for(&item) {
        let tag = if package.popular { " [热门]" } else { "" };
        println!("  {}. {} - {}{}", package.id, package.label, format_peso(package.price), tag);
    }

    Ok(())
}

async fn do_promos(ctx: &Context) -> anyhow::Result<()> {
    let cache = ctx.cache();
    let page = Catalog::new(&ctx.api, &cache).promos().await;

    if let Some(error) = &page.stale {
        eprintln!("{}（显示本地缓存）", error);
    }
    if page.items.is_empty() {
        println!("暂无轮播图");
    }
    for promo in &page.items {
        println!(
            "[{}] {} - {}",
            promo.id,
            promo.title.as_deref().unwrap_or("Untitled"),
            promo.description.as_deref().unwrap_or("")
        );
    }

    Ok(())
}

async fn do_news(ctx: &Context) -> anyhow::Result<()> {
    let cache = ctx.cache();
    let page = Catalog::new(&ctx.api, &cache).news().await;

    if let Some(error) = &page.stale {
        eprintln!("{}（显示本地缓存）", error);
    }
    if page.items.is_empty() {
        println!("暂无新闻");
    }
    for entry in &page.items {
        println!(
            "{} {} ({})",
            entry.icon.as_deref().unwrap_or("📰"),
            entry.title,
            entry.date.as_deref().unwrap_or("")
        );
        println!("   {}", entry.description);
    }

    Ok(())
}

async fn do_buy(
    ctx: &Context,
    game_id: i64,
    package_id: u32,
    payment: &str,
    details: UserDetails,
) -> anyhow::Result<()> {
    let session = ctx.sessions().current_session()?;
    let cache = ctx.cache();
    let item = Catalog::new(&ctx.api, &cache)
        .find(game_id)
        .await?
        .ok_or_else(|| anyhow!("Item not found"))?;

    let mut flow = PurchaseFlow::new();
    flow.open(session.as_ref(), item)?;

    // 第一步：选择套餐
    if let Some(package) = flow.packages().into_iter().find(|p| p.id == package_id) {
        flow.select_package(package)?;
    }
    flow.advance()?;

    // 第二步：支付方式与充值信息
    flow.select_payment(payment.parse::<PaymentMethod>()?)?;
    flow.set_details(details)?;
    flow.advance()?;

    // 第三步：确认
    if let Some(summary) = flow.summary() {
        println!("商品: {}", summary.game);
        println!("套餐: {}", summary.package);
        println!("用户ID: {}", summary.user_id);
        println!("服务器: {}", summary.server);
        println!("支付方式: {}", summary.payment);
        println!("邮箱: {}", summary.email);
        println!("合计: {}", format_peso(summary.total));
    }

    let session = session.ok_or_else(|| anyhow!("Please login to continue"))?;
    println!("正在下单...");
    let receipt = flow.place_order(&ctx.api, &session, &cache).await?;

    println!("下单成功!");
    println!("订单号: {}", receipt.order_number);
    println!("交易号: {}", format_order_number(receipt.transaction_id));
    println!("金额: {}", receipt.total_display());

    Ok(())
}

async fn do_orders(ctx: &Context) -> anyhow::Result<()> {
    let session = ctx
        .sessions()
        .current_session()?
        .ok_or_else(|| anyhow!("Please login to continue"))?;

    let totals = match ctx.api.user_transactions(session.user_id).await {
        Ok(transactions) => {
            if transactions.is_empty() {
                println!("暂无订单");
            }
            for tx in &transactions {
                println!(
                    "{} {} - {} - [{}] - {}",
                    format_order_number(tx.id),
                    tx.item_name.as_deref().unwrap_or("Unknown item"),
                    format_peso(tx.final_price),
                    status_badge(tx.status),
                    format_transaction_date(tx.created_at.as_deref())
                );
            }
            OrderTotals::from_transactions(&transactions)
        }
        Err(e) => {
            eprintln!("{}（显示本地记录）", e);
            for order in ctx.cache().orders() {
                println!(
                    "{} {} - {} - {} - {}",
                    order.order_number,
                    order.game,
                    order.package,
                    format_peso(order.price),
                    order.date.format("%Y-%m-%d %H:%M")
                );
            }
            OrderTotals::default()
        }
    };

    println!("订单总数: {}", totals.orders);
    println!("累计消费: {}", totals.spent_display());

    Ok(())
}

/// 未通过检查时提示、等待后以跳转目标作为错误返回
async fn enforce_gate(gate: &AccessGate, session: Option<&Session>) -> anyhow::Result<()> {
    if let AccessDecision::Denied {
        notice,
        redirect_to,
        delay,
        ..
    } = gate.check(session)
    {
        eprintln!("{}", notice);
        tokio::time::sleep(delay).await;
        return Err(anyhow!("跳转到: {}", redirect_to));
    }
    Ok(())
}

async fn do_admin(ctx: &Context, command: AdminCommands) -> anyhow::Result<()> {
    let session = ctx.sessions().current_session()?;
    let gate = AccessGate::default();
    enforce_gate(&gate, session.as_ref()).await?;

    let console = AdminConsole::new(&ctx.api, &gate, session.as_ref())?;
    let cache = ctx.cache();

    match command {
        AdminCommands::Games => {
            let games = console.games().await?;
            if let Err(e) = cache.store_games(&games) {
                tracing::warn!("Failed to cache games: {}", e);
            }
            for item in &games {
                println!(
                    "[{}] {} - {} - {} - {} 档套餐",
                    item.id,
                    item.name,
                    item.display_category(),
                    price_display(item),
                    item.price_options.len()
                );
            }
        }
        AdminCommands::AddGame {
            name,
            category,
            description,
            currency,
            image,
            icon,
            options,
        } => {
            let form = GameForm {
                name,
                category,
                description,
                currency,
                image: data_url_from_file(&image)?,
                currency_icon: data_url_from_file(&icon)?,
                price_options: options,
            };
            let id = console.add_game(&form).await?;
            println!("Game added successfully! (#{})", id);
        }
        AdminCommands::DeleteGame { id } => {
            console.delete_game(id).await?;
            println!("Game deleted successfully!");
        }
        AdminCommands::Promos => {
            let promos = console.promos().await?;
            if let Err(e) = cache.store_promos(&promos) {
                tracing::warn!("Failed to cache promos: {}", e);
            }
            for promo in &promos {
                println!(
                    "[{}] {} ({} bytes)",
                    promo.id,
                    promo.title.as_deref().unwrap_or("Untitled"),
                    promo.image.len()
                );
            }
        }
        AdminCommands::AddPromo {
            image,
            title,
            description,
        } => {
            let promo = NewPromo {
                image: data_url_from_file(&image)?,
                title,
                description,
            };
            let id = console.add_promo(&promo).await?;
            println!("Promo added successfully! (#{})", id);
        }
        AdminCommands::DeletePromo { id } => {
            console.delete_promo(id).await?;
            println!("Promo deleted successfully!");
        }
        AdminCommands::News => {
            let news = console.news().await?;
            if let Err(e) = cache.store_news(&news) {
                tracing::warn!("Failed to cache news: {}", e);
            }
            for entry in &news {
                println!(
                    "[{}] {} {} - {}",
                    entry.id,
                    entry.icon.as_deref().unwrap_or(""),
                    entry.title,
                    entry.date.as_deref().unwrap_or("")
                );
            }
        }
        AdminCommands::AddNews {
            title,
            description,
            date,
            icon,
        } => {
            let draft = NewsDraft {
                title,
                description,
                date,
                icon,
            };
            let id = console.add_news(&draft).await?;
            println!("News added successfully! (#{})", id);
        }
        AdminCommands::UpdateNews {
            id,
            title,
            description,
            date,
            icon,
        } => {
            let draft = NewsDraft {
                title,
                description,
                date,
                icon,
            };
            console.update_news(id, &draft).await?;
            println!("News updated successfully!");
        }
        AdminCommands::DeleteNews { id } => {
            console.delete_news(id).await?;
            println!("News deleted successfully!");
        }
        AdminCommands::Transactions => {
            let (transactions, stats) = console.transactions().await?;
            println!("交易总数: {}", stats.total);
            println!("总收入: {}", format_peso(stats.revenue));
            println!("已完成: {}", stats.completed);
            println!("待处理: {}", stats.pending);
            println!("用户数: {}", stats.unique_users);
            if transactions.is_empty() {
                println!("No transactions found");
            }
            for tx in &transactions {
                println!(
                    "{} {} - {} - {} - [{}] - {}",
                    format_order_number(tx.id),
                    tx.user_username.as_deref().unwrap_or("Unknown"),
                    tx.item_name.as_deref().unwrap_or("Unknown item"),
                    format_peso(tx.final_price),
                    status_badge(tx.status),
                    format_transaction_date(tx.created_at.as_deref())
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_option() {
        let option = parse_price_option("100:50.5").unwrap();
        assert_eq!(option.amount, 100);
        assert_eq!(option.price, 50.5);
        assert!(parse_price_option("100").is_err());
        assert!(parse_price_option("x:1").is_err());
    }

    #[test]
    fn test_cli_parses_buy() {
        let cli = Cli::try_parse_from([
            "currency-hub", "buy", "3", "--package", "2", "--payment", "gcash", "--user-id", "u1",
            "--email", "a@b.com",
        ])
        .unwrap();
        match cli.command {
            Commands::Buy { game_id, package, game_server, .. } => {
                assert_eq!(game_id, 3);
                assert_eq!(package, 2);
                assert!(game_server.is_none());
            }
            _ => panic!("expected buy"),
        }
    }

    #[tokio::test]
    async fn test_gate_denial_returns_redirect_error() {
        let gate = AccessGate {
            redirect_to: "index".to_string(),
            delay: std::time::Duration::from_millis(0),
        };
        let err = enforce_gate(&gate, None).await.unwrap_err();
        assert_eq!(err.to_string(), "跳转到: index");
    }

    #[test]
    fn test_cli_parses_storefront_lists() {
        let cli = Cli::try_parse_from(["currency-hub", "promos"]).unwrap();
        assert!(matches!(cli.command, Commands::Promos));
        let cli = Cli::try_parse_from(["currency-hub", "news"]).unwrap();
        assert!(matches!(cli.command, Commands::News));
    }
}
