//! SOCKS5 protocol constants (RFC 1928 subset).

pub const SOCKS5_VERSION: u8 = 0x05;

pub const SOCKS5_CMD_CONNECT: u8 = 0x01;

pub const SOCKS5_ADDR_IPV4: u8 = 0x01;
pub const SOCKS5_ADDR_DOMAIN: u8 = 0x03;
pub const SOCKS5_ADDR_IPV6: u8 = 0x04;

pub const SOCKS5_AUTH_NONE: u8 = 0x00;
pub const SOCKS5_AUTH_UNSUPPORTED: u8 = 0xFF;

pub const SOCKS5_REPLY_SUCCESS: u8 = 0x00;
pub const SOCKS5_REPLY_COMMAND_NOT_SUPPORTED: u8 = 0x07;

pub const SOCKS5_RESERVED: u8 = 0x00;
