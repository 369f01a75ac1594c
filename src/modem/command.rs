//! SIM800 AT command table.
//!
//! Each variant carries its own literal (or template argument), the line
//! that terminates its response, and its budget of idle UART polls.  The
//! strings here are the hardware protocol and must not be reworded.
//! [`AtCommand::Raw`] is the escape hatch for commands outside the table.

/// Terminator and budget for commands sent through [`AtCommand::Raw`].
pub const RAW_TERMINATOR: &str = "OK";
pub const RAW_TIMEOUT_POLLS: u32 = 3;

/// A single AT request, with any template data borrowed from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtCommand<'a> {
    ModemInfo,
    FwRevision,
    Battery,
    Scan,
    Network,
    Signal,
    CheckReg,
    SetApn(&'a str),
    SetUser(&'a str),
    SetPwd(&'a str),
    InitGprs,
    OpenGprs,
    GetBearer,
    InitHttp,
    SetHttp,
    CheckSsl,
    EnableSsl,
    DisableSsl,
    InitUrl(&'a str),
    DoGet,
    SetContent(&'a str),
    PostLen(usize),
    /// POST body, written verbatim.
    DumpData(&'a str),
    DoPost,
    GetData,
    CloseHttp,
    CloseBearer,
    SyncBaud,
    Reset,
    Disconnect,
    CheckPin,
    NoSms,
    PppSetApn(&'a str),
    PppConnect,
    RfOn,
    RfOff,
    EchoOn,
    EchoOff,
    /// Unregistered command line; terminates on `OK` within 3 polls.
    Raw(&'a str),
}

impl AtCommand<'_> {
    /// Short identifier used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ModemInfo => "modeminfo",
            Self::FwRevision => "fwrevision",
            Self::Battery => "battery",
            Self::Scan => "scan",
            Self::Network => "network",
            Self::Signal => "signal",
            Self::CheckReg => "checkreg",
            Self::SetApn(_) => "setapn",
            Self::SetUser(_) => "setuser",
            Self::SetPwd(_) => "setpwd",
            Self::InitGprs => "initgprs",
            Self::OpenGprs => "opengprs",
            Self::GetBearer => "getbear",
            Self::InitHttp => "inithttp",
            Self::SetHttp => "sethttp",
            Self::CheckSsl => "checkssl",
            Self::EnableSsl => "enablessl",
            Self::DisableSsl => "disablessl",
            Self::InitUrl(_) => "initurl",
            Self::DoGet => "doget",
            Self::SetContent(_) => "setcontent",
            Self::PostLen(_) => "postlen",
            Self::DumpData(_) => "dumpdata",
            Self::DoPost => "dopost",
            Self::GetData => "getdata",
            Self::CloseHttp => "closehttp",
            Self::CloseBearer => "closebear",
            Self::SyncBaud => "syncbaud",
            Self::Reset => "reset",
            Self::Disconnect => "disconnect",
            Self::CheckPin => "checkpin",
            Self::NoSms => "nosms",
            Self::PppSetApn(_) => "ppp_setapn",
            Self::PppConnect => "ppp_connect",
            Self::RfOn => "rfon",
            Self::RfOff => "rfoff",
            Self::EchoOn => "echoon",
            Self::EchoOff => "echooff",
            Self::Raw(_) => "raw",
        }
    }

    /// Line (without CRLF) that ends the response.  Terminators with a
    /// payload (`+HTTPACTION: 0,200,5`) match by prefix after a blank line.
    pub fn terminator(&self) -> &'static str {
        match self {
            Self::DoGet | Self::DoPost => "+HTTPACTION",
            Self::PostLen(_) => "DOWNLOAD",
            Self::PppConnect => "CONNECT",
            _ => RAW_TERMINATOR,
        }
    }

    /// Idle polls tolerated before the command times out.
    pub fn timeout_polls(&self) -> u32 {
        match self {
            Self::Scan => 60,
            Self::Disconnect => 20,
            Self::DumpData(_) => 1,
            _ => RAW_TIMEOUT_POLLS,
        }
    }

    /// Render the command line as written to the UART, minus the CRLF.
    pub fn render(&self) -> String {
        let literal = match self {
            Self::ModemInfo => "ATI",
            Self::FwRevision => "AT+CGMR",
            Self::Battery => "AT+CBC",
            Self::Scan => "AT+COPS=?",
            Self::Network => "AT+COPS?",
            Self::Signal => "AT+CSQ",
            Self::CheckReg => "AT+CREG?",
            Self::InitGprs => "AT+SAPBR=3,1,\"Contype\",\"GPRS\"",
            Self::OpenGprs => "AT+SAPBR=1,1",
            Self::GetBearer => "AT+SAPBR=2,1",
            Self::InitHttp => "AT+HTTPINIT",
            Self::SetHttp => "AT+HTTPPARA=\"CID\",1",
            Self::CheckSsl => "AT+CIPSSL=?",
            Self::EnableSsl => "AT+HTTPSSL=1",
            Self::DisableSsl => "AT+HTTPSSL=0",
            Self::DoGet => "AT+HTTPACTION=0",
            Self::DoPost => "AT+HTTPACTION=1",
            Self::GetData => "AT+HTTPREAD",
            Self::CloseHttp => "AT+HTTPTERM",
            Self::CloseBearer => "AT+SAPBR=0,1",
            Self::SyncBaud => "AT",
            Self::Reset => "ATZ",
            Self::Disconnect => "ATH",
            Self::CheckPin => "AT+CPIN?",
            Self::NoSms => "AT+CNMI=0,0,0,0,0",
            Self::PppConnect => "AT+CGDATA=\"PPP\",1",
            Self::RfOn => "AT+CFUN=1",
            Self::RfOff => "AT+CFUN=4",
            Self::EchoOn => "ATE1",
            Self::EchoOff => "ATE0",
            Self::SetApn(v) => return format!("AT+SAPBR=3,1,\"APN\",\"{v}\""),
            Self::SetUser(v) => return format!("AT+SAPBR=3,1,\"USER\",\"{v}\""),
            Self::SetPwd(v) => return format!("AT+SAPBR=3,1,\"PWD\",\"{v}\""),
            Self::InitUrl(v) => return format!("AT+HTTPPARA=\"URL\",\"{v}\""),
            Self::SetContent(v) => return format!("AT+HTTPPARA=\"CONTENT\",\"{v}\""),
            Self::PppSetApn(v) => return format!("AT+CGDCONT=1,\"IP\",\"{v}\""),
            Self::PostLen(len) => return format!("AT+HTTPDATA={len},5000"),
            Self::DumpData(data) | Self::Raw(data) => *data,
        };
        literal.to_string()
    }
}
